//! Run a release plan over a small synthetic table and print a utility
//! report. Pass a `.yaml` or `.json` plan path to use your own plan.
//!
//! `RUST_LOG=ldp=debug cargo run -p ldp --example release_plan`

use ldp::{Column, CorrelationMethod, Dataset, ReleasePlan, UtilityReport};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_PLAN: &str = r#"
steps:
  - column: age
    mechanism: { kind: laplace, epsilon: 1.0, lower: 17, upper: 90 }
  - column: sex
    write_new_column: true
    mechanism: { kind: randomized_response_binary, epsilon: 1.0, positive_label: Female }
  - column: workclass
    mechanism: { kind: randomized_response_kary, epsilon: 2.0 }
"#;

fn synthetic(rows: usize, rng: &mut ChaCha8Rng) -> ldp::Result<Dataset> {
    let workclasses = ["Private", "Self-emp", "Federal-gov", "Local-gov"];
    let age: Vec<i64> = (0..rows).map(|_| rng.gen_range(17..=90)).collect();
    let sex: Vec<&str> = (0..rows)
        .map(|_| if rng.gen_bool(0.33) { "Female" } else { "Male" })
        .collect();
    let workclass: Vec<&str> = (0..rows)
        .map(|_| workclasses[rng.gen_range(0..workclasses.len())])
        .collect();
    Dataset::from_columns([
        ("age", Column::Integer(age)),
        ("sex", Column::from(sex)),
        ("workclass", Column::from(workclass)),
    ])
}

fn main() -> ldp::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let plan = match std::env::args().nth(1) {
        Some(path) => ReleasePlan::from_path(path)?,
        None => ReleasePlan::from_yaml_str(DEFAULT_PLAN)?,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let original = synthetic(1_000, &mut rng)?;
    let released = plan.apply(&original, &mut rng)?;

    let report = UtilityReport::evaluate(&plan, &original, &released, CorrelationMethod::Pearson)?;
    println!("{}", report.to_json_pretty()?);
    Ok(())
}
