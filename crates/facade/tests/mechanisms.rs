mod common;

use std::collections::BTreeSet;

use common::{census, EDUCATION, SEXES};
use ldp::{
    apply_exponential, apply_gaussian, apply_laplace, apply_randomized_response_binary,
    apply_randomized_response_kary, Bounds, Column, ColumnKind, DpError, OutputPlacement,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn labels(column: &Column) -> BTreeSet<String> {
    column
        .as_categorical()
        .expect("categorical column")
        .iter()
        .cloned()
        .collect()
}

#[test]
fn laplace_age_stays_integral_and_in_range() {
    let ds = census(500, 1);
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let out = apply_laplace(
        &ds,
        "age",
        1.0,
        Bounds::default(),
        OutputPlacement::InPlace,
        &mut rng,
    )
    .expect("numeric column");

    assert_eq!(out.n_rows(), ds.n_rows());
    assert_eq!(
        out.column_names().collect::<Vec<_>>(),
        ds.column_names().collect::<Vec<_>>()
    );
    let Column::Integer(ages) = out.column("age").expect("present") else {
        panic!("age must stay an integer column");
    };
    assert!(ages.iter().all(|a| (17..=90).contains(a)));
    assert_ne!(out.column("age").expect("present"), ds.column("age").expect("present"));
}

#[test]
fn gaussian_new_column_leaves_source_untouched() {
    let ds = census(200, 2);
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let out = apply_gaussian(
        &ds,
        "hours",
        2.0,
        1e-5,
        Bounds::explicit(0.0, 99.0),
        OutputPlacement::NewColumn,
        &mut rng,
    )
    .expect("numeric column");

    assert_eq!(out.column("hours").expect("present"), ds.column("hours").expect("present"));
    let noisy = out.column("dp_hours").expect("derived column");
    assert_eq!(noisy.kind(), ColumnKind::Float);
    let values = noisy.to_f64().expect("numeric");
    assert!(values.iter().all(|v| (0.0..=99.0).contains(v)));
}

#[test]
fn binary_rr_keeps_labels() {
    let ds = census(300, 3);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let out = apply_randomized_response_binary(
        &ds,
        "sex",
        1.0,
        Some("Female"),
        OutputPlacement::InPlace,
        &mut rng,
    )
    .expect("binary column");
    let allowed: BTreeSet<String> = SEXES.iter().map(|s| s.to_string()).collect();
    assert!(labels(out.column("sex").expect("present")).is_subset(&allowed));
}

#[test]
fn binary_rr_rejects_three_categories() {
    let ds = census(100, 4);
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let err = apply_randomized_response_binary(
        &ds,
        "race",
        1.0,
        None,
        OutputPlacement::InPlace,
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, DpError::InvalidColumnType { .. }));
}

#[test]
fn categorical_mechanisms_stay_in_alphabet() {
    let ds = census(300, 5);
    let allowed: BTreeSet<String> = EDUCATION.iter().map(|s| s.to_string()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    let kary = apply_randomized_response_kary(
        &ds,
        "education",
        0.5,
        OutputPlacement::NewColumn,
        &mut rng,
    )
    .expect("four categories");
    assert!(labels(kary.column("dp_education").expect("derived")).is_subset(&allowed));

    let expo = apply_exponential(&ds, "education", 0.5, OutputPlacement::InPlace, &mut rng)
        .expect("categorical column");
    assert!(labels(expo.column("education").expect("present")).is_subset(&allowed));
}

#[test]
fn wrong_column_kinds_are_rejected() {
    let ds = census(50, 6);
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    assert!(matches!(
        apply_laplace(&ds, "sex", 1.0, Bounds::default(), OutputPlacement::InPlace, &mut rng),
        Err(DpError::InvalidColumnType { .. })
    ));
    assert!(matches!(
        apply_exponential(&ds, "age", 1.0, OutputPlacement::InPlace, &mut rng),
        Err(DpError::InvalidColumnType { .. })
    ));
    assert!(matches!(
        apply_randomized_response_kary(&ds, "sex", 1.0, OutputPlacement::InPlace, &mut rng),
        Err(DpError::InvalidColumnType { .. })
    ));
    assert!(matches!(
        apply_laplace(&ds, "income", 1.0, Bounds::default(), OutputPlacement::InPlace, &mut rng),
        Err(DpError::ColumnNotFound { .. })
    ));
}

#[test]
fn same_seed_same_release() {
    let ds = census(100, 7);
    let run = |seed| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        apply_laplace(&ds, "hours", 1.0, Bounds::default(), OutputPlacement::InPlace, &mut rng)
            .expect("numeric column")
    };
    assert_eq!(run(42), run(42));
}
