#![allow(dead_code)]

use ldp::{Column, Dataset};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const SEXES: [&str; 2] = ["Male", "Female"];
pub const EDUCATION: [&str; 4] = ["HS-grad", "Bachelors", "Masters", "Doctorate"];
pub const RACES: [&str; 3] = ["White", "Black", "Asian-Pac-Islander"];

/// Synthetic census-like table with correlated age and hours.
pub fn census(rows: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut age = Vec::with_capacity(rows);
    let mut hours = Vec::with_capacity(rows);
    let mut sex = Vec::with_capacity(rows);
    let mut education = Vec::with_capacity(rows);
    let mut race = Vec::with_capacity(rows);
    for _ in 0..rows {
        let a: i64 = rng.gen_range(17..=90);
        age.push(a);
        hours.push(20.0 + 0.4 * a as f64 + rng.gen_range(-5.0..5.0));
        sex.push(SEXES[rng.gen_range(0..SEXES.len())]);
        education.push(EDUCATION[rng.gen_range(0..EDUCATION.len())]);
        race.push(RACES[rng.gen_range(0..RACES.len())]);
    }
    Dataset::from_columns([
        ("age", Column::Integer(age)),
        ("hours", Column::Float(hours)),
        ("sex", Column::from(sex)),
        ("education", Column::from(education)),
        ("race", Column::from(race)),
    ])
    .expect("columns have equal length")
}
