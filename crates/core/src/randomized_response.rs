//! Randomized response for binary and k-ary categorical columns.

use rand::Rng;

use crate::dataset::{alphabet, Column, Dataset, OutputPlacement};
use crate::error::{check_epsilon, DpError, Result};
use crate::mechanism::ColumnMechanism;

/// `e^x / (e^x + 1)` without overflow.
fn logistic(x: f64) -> f64 {
    if !x.is_finite() {
        return if x.is_sign_positive() { 1.0 } else { 0.0 };
    }
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn categorical_alphabet<'a>(
    mechanism: &str,
    column_name: &str,
    column: &'a Column,
) -> Result<(&'a [String], Vec<String>)> {
    let values = column.as_categorical().ok_or_else(|| {
        DpError::column_type(
            column_name,
            format!(
                "{mechanism} randomized response needs a categorical column, found {}",
                column.kind()
            ),
        )
    })?;
    Ok((values, alphabet(values)))
}

fn binary_alphabet<'a>(
    column_name: &str,
    column: &'a Column,
) -> Result<(&'a [String], Vec<String>)> {
    let (values, categories) = categorical_alphabet("binary", column_name, column)?;
    if categories.len() != 2 {
        return Err(DpError::column_type(
            column_name,
            format!(
                "binary randomized response needs exactly 2 categories, found {}",
                categories.len()
            ),
        ));
    }
    Ok((values, categories))
}

fn kary_alphabet<'a>(
    column_name: &str,
    column: &'a Column,
) -> Result<(&'a [String], Vec<String>)> {
    let (values, categories) = categorical_alphabet("k-ary", column_name, column)?;
    let k = categories.len();
    if k <= 2 {
        return Err(DpError::column_type(
            column_name,
            format!("k-ary randomized response needs more than 2 categories, found {k}"),
        ));
    }
    Ok((values, categories))
}

/// Binary randomized response.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryRandomizedResponse {
    /// Privacy budget.
    pub epsilon: f64,
    /// Label encoded as the positive outcome; defaults to the first
    /// category of the sorted alphabet.
    pub positive_label: Option<String>,
}

impl BinaryRandomizedResponse {
    /// Create a new binary randomized response.
    pub fn new(epsilon: f64) -> Result<Self> {
        check_epsilon(epsilon)?;
        Ok(Self {
            epsilon,
            positive_label: None,
        })
    }

    /// Designate the positive label.
    pub fn with_positive_label<S: Into<String>>(mut self, label: S) -> Self {
        self.positive_label = Some(label.into());
        self
    }

    /// Probability of reporting the true value, `e^ε / (e^ε + 1)`.
    pub fn retention_probability(&self) -> f64 {
        logistic(self.epsilon)
    }

    /// Randomize a single boolean.
    pub fn respond<R: Rng + ?Sized>(&self, truth: bool, rng: &mut R) -> bool {
        if rng.gen_bool(self.retention_probability()) {
            truth
        } else {
            !truth
        }
    }
}

impl ColumnMechanism for BinaryRandomizedResponse {
    fn name(&self) -> &'static str {
        "randomized_response_binary"
    }

    fn privatize<R: Rng + ?Sized>(
        &self,
        column_name: &str,
        column: &Column,
        rng: &mut R,
    ) -> Result<Column> {
        let (values, categories) = binary_alphabet(column_name, column)?;

        let (positive, negative) = match self.positive_label.as_deref() {
            None => (&categories[0], &categories[1]),
            Some(label) => match categories.iter().position(|c| c == label) {
                Some(idx) => (&categories[idx], &categories[1 - idx]),
                None => {
                    return Err(DpError::invalid(format!(
                        "positive label `{label}` is not a value of column `{column_name}`"
                    )));
                }
            },
        };

        tracing::debug!(
            target: "ldp::mechanism",
            mechanism = "randomized_response_binary",
            column = column_name,
            epsilon = self.epsilon,
            retention = self.retention_probability(),
            positive = %positive,
            "flipping labels"
        );

        let out = values
            .iter()
            .map(|v| {
                if self.respond(v == positive, rng) {
                    positive.clone()
                } else {
                    negative.clone()
                }
            })
            .collect();
        Ok(Column::Categorical(out))
    }
}

/// K-ary (direct encoding) randomized response for alphabets of size `k > 2`.
///
/// The true category is reported with probability `e^ε / (e^ε + k - 1)` and
/// each other category with probability `1 / (e^ε + k - 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct KaryRandomizedResponse {
    /// Privacy budget.
    pub epsilon: f64,
}

impl KaryRandomizedResponse {
    /// Create a new k-ary randomized response.
    pub fn new(epsilon: f64) -> Result<Self> {
        check_epsilon(epsilon)?;
        Ok(Self { epsilon })
    }

    /// Probability of reporting the true category for an alphabet of size `k`.
    pub fn retention_probability(&self, k: usize) -> f64 {
        if k <= 1 {
            return 1.0;
        }
        // e^ε / (e^ε + k - 1), rearranged to avoid overflow.
        1.0 / (1.0 + (k as f64 - 1.0) * (-self.epsilon).exp())
    }

    /// Probability of reporting one specific other category.
    pub fn flip_probability(&self, k: usize) -> f64 {
        if k <= 1 {
            return 0.0;
        }
        (1.0 - self.retention_probability(k)) / (k as f64 - 1.0)
    }

    /// Randomize the category at index `truth` of an alphabet of size `k`.
    pub fn respond<R: Rng + ?Sized>(&self, truth: usize, k: usize, rng: &mut R) -> usize {
        if k <= 1 || rng.gen_bool(self.retention_probability(k)) {
            return truth;
        }
        let other = rng.gen_range(0..k - 1);
        if other >= truth {
            other + 1
        } else {
            other
        }
    }
}

impl ColumnMechanism for KaryRandomizedResponse {
    fn name(&self) -> &'static str {
        "randomized_response_kary"
    }

    fn privatize<R: Rng + ?Sized>(
        &self,
        column_name: &str,
        column: &Column,
        rng: &mut R,
    ) -> Result<Column> {
        let (values, categories) = kary_alphabet(column_name, column)?;
        let k = categories.len();

        tracing::debug!(
            target: "ldp::mechanism",
            mechanism = "randomized_response_kary",
            column = column_name,
            epsilon = self.epsilon,
            k,
            retention = self.retention_probability(k),
            "randomizing labels"
        );

        let out = values
            .iter()
            .map(|v| {
                let truth = categories
                    .binary_search(v)
                    .map_err(|_| DpError::numerical("value missing from its own alphabet"))?;
                Ok(categories[self.respond(truth, k, rng)].clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Column::Categorical(out))
    }
}

/// Apply binary randomized response to a two-valued categorical column.
pub fn apply_randomized_response_binary<R: Rng + ?Sized>(
    dataset: &Dataset,
    column: &str,
    epsilon: f64,
    positive_label: Option<&str>,
    placement: OutputPlacement,
    rng: &mut R,
) -> Result<Dataset> {
    binary_alphabet(column, dataset.column(column)?)?;
    let mut mechanism = BinaryRandomizedResponse::new(epsilon)?;
    if let Some(label) = positive_label {
        mechanism = mechanism.with_positive_label(label);
    }
    mechanism.apply(dataset, column, placement, rng)
}

/// Apply k-ary randomized response to a categorical column with more than
/// two categories.
pub fn apply_randomized_response_kary<R: Rng + ?Sized>(
    dataset: &Dataset,
    column: &str,
    epsilon: f64,
    placement: OutputPlacement,
    rng: &mut R,
) -> Result<Dataset> {
    kary_alphabet(column, dataset.column(column)?)?;
    KaryRandomizedResponse::new(epsilon)?.apply(dataset, column, placement, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn adult() -> Dataset {
        let sex: Vec<&str> = ["Male", "Female"].iter().copied().cycle().take(1_000).collect();
        let race: Vec<&str> = ["White", "Black", "Asian-Pac-Islander"]
            .iter()
            .copied()
            .cycle()
            .take(1_000)
            .collect();
        Dataset::from_columns([
            ("sex", Column::from(sex)),
            ("race", Column::from(race)),
            ("age", Column::Integer((0..1_000).map(|i| 17 + i % 74).collect())),
        ])
        .expect("valid dataset")
    }

    #[test]
    fn column_shape_is_checked_before_budget() {
        let ds = adult();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let inplace = OutputPlacement::InPlace;
        assert!(matches!(
            apply_randomized_response_binary(&ds, "race", 0.0, None, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_randomized_response_kary(&ds, "sex", -1.0, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_randomized_response_binary(&ds, "age", 0.0, None, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_randomized_response_binary(&ds, "sex", 0.0, None, inplace, &mut rng),
            Err(DpError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn binary_retention_limits() {
        let strong = BinaryRandomizedResponse::new(1e-9).expect("valid");
        assert!((strong.retention_probability() - 0.5).abs() < 1e-6);
        let weak = BinaryRandomizedResponse::new(1e3).expect("valid");
        assert_eq!(weak.retention_probability(), 1.0);
        let one = BinaryRandomizedResponse::new(1.0).expect("valid");
        let e = 1.0f64.exp();
        assert!((one.retention_probability() - e / (e + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn binary_sex_scenario() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let ds = adult();
        let out = apply_randomized_response_binary(
            &ds,
            "sex",
            1.0,
            Some("Female"),
            OutputPlacement::InPlace,
            &mut rng,
        )
        .expect("valid call");
        let sex = out
            .column("sex")
            .expect("sex")
            .as_categorical()
            .expect("categorical");
        assert_eq!(sex.len(), 1_000);
        assert!(sex.iter().all(|s| s == "Male" || s == "Female"));
    }

    #[test]
    fn binary_empirical_retention() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let ds = adult();
        let out = apply_randomized_response_binary(
            &ds,
            "sex",
            1.0,
            None,
            OutputPlacement::NewColumn,
            &mut rng,
        )
        .expect("valid call");
        let orig = ds.column("sex").expect("sex").as_categorical().expect("labels");
        let dp = out
            .column("dp_sex")
            .expect("dp_sex")
            .as_categorical()
            .expect("labels");
        let kept = orig.iter().zip(dp).filter(|(a, b)| a == b).count() as f64 / 1_000.0;
        let e = 1.0f64.exp();
        assert!((kept - e / (e + 1.0)).abs() < 0.05);
    }

    #[test]
    fn binary_rejects_non_binary_columns() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ds = adult();
        let inplace = OutputPlacement::InPlace;
        assert!(matches!(
            apply_randomized_response_binary(&ds, "race", 1.0, None, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_randomized_response_binary(&ds, "age", 1.0, None, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_randomized_response_binary(&ds, "sex", 1.0, Some("Other"), inplace, &mut rng),
            Err(DpError::InvalidParameter { .. })
        ));
        assert!(matches!(
            apply_randomized_response_binary(&ds, "sex", 0.0, None, inplace, &mut rng),
            Err(DpError::InvalidParameter { .. })
        ));
        assert!(matches!(
            apply_randomized_response_binary(&ds, "sexx", 1.0, None, inplace, &mut rng),
            Err(DpError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn kary_probabilities_sum_to_one() {
        let rr = KaryRandomizedResponse::new(1.5).expect("valid");
        for k in 3..10 {
            let total = rr.retention_probability(k) + (k - 1) as f64 * rr.flip_probability(k);
            assert!((total - 1.0).abs() < 1e-12);
            let ratio = rr.retention_probability(k) / rr.flip_probability(k);
            assert!((ratio - 1.5f64.exp()).abs() < 1e-9);
        }
    }

    #[test]
    fn kary_flips_uniformly_to_other_categories() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let rr = KaryRandomizedResponse::new(0.5).expect("valid");
        let mut counts = [0usize; 4];
        let n = 40_000;
        for _ in 0..n {
            counts[rr.respond(2, 4, &mut rng)] += 1;
        }
        let p = rr.retention_probability(4);
        let q = rr.flip_probability(4);
        assert!((counts[2] as f64 / n as f64 - p).abs() < 0.02);
        for i in [0, 1, 3] {
            assert!((counts[i] as f64 / n as f64 - q).abs() < 0.02);
        }
    }

    #[test]
    fn kary_column() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let ds = adult();
        let out = apply_randomized_response_kary(
            &ds,
            "race",
            2.0,
            OutputPlacement::InPlace,
            &mut rng,
        )
        .expect("valid call");
        let race = out.column("race").expect("race").as_categorical().expect("labels");
        let observed = alphabet(race);
        assert!(observed
            .iter()
            .all(|r| ["White", "Black", "Asian-Pac-Islander"].contains(&r.as_str())));

        let inplace = OutputPlacement::InPlace;
        assert!(matches!(
            apply_randomized_response_kary(&ds, "sex", 1.0, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_randomized_response_kary(&ds, "race", -2.0, inplace, &mut rng),
            Err(DpError::InvalidParameter { .. })
        ));
    }
}
