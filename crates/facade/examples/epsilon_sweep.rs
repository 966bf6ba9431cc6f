use ldp::{
    apply_gaussian, apply_laplace, correlation_loss, Bounds, Column, CorrelationMethod, Dataset,
    OutputPlacement,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn main() -> ldp::Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let age: Vec<i64> = (0..2_000).map(|_| rng.gen_range(17..=90)).collect();
    let hours: Vec<f64> = age
        .iter()
        .map(|&a| 25.0 + 0.3 * a as f64 + rng.gen_range(-4.0..4.0))
        .collect();
    let ds = Dataset::from_columns([("age", Column::Integer(age)), ("hours", Column::Float(hours))])?;
    let features = ["age", "hours"];

    println!("epsilon  laplace_loss%  gaussian_loss%");
    for epsilon in [0.1, 0.5, 1.0, 2.0, 5.0, 10.0] {
        let laplace = apply_laplace(
            &ds,
            "age",
            epsilon,
            Bounds::default(),
            OutputPlacement::NewColumn,
            &mut rng,
        )?;
        let gaussian = apply_gaussian(
            &ds,
            "age",
            epsilon,
            1e-5,
            Bounds::default(),
            OutputPlacement::NewColumn,
            &mut rng,
        )?;
        let method = CorrelationMethod::Pearson;
        let l = correlation_loss(&ds, &laplace, &features, method, OutputPlacement::NewColumn)?;
        let g = correlation_loss(&ds, &gaussian, &features, method, OutputPlacement::NewColumn)?;
        println!("{epsilon:>7.1}  {l:>13.2}  {g:>14.2}");
    }
    Ok(())
}
