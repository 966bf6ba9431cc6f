//! Exponential mechanism over a categorical alphabet.
//!
//! Each value is scored against every category of the observed alphabet
//! (1 for the true category, 0 otherwise) and a category is drawn with
//! probability proportional to `exp(epsilon * score / (2 * sensitivity))`.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::dataset::{alphabet, Column, Dataset, OutputPlacement};
use crate::error::{check_epsilon, DpError, Result};
use crate::mechanism::ColumnMechanism;

/// Sensitivity of the indicator score.
const SCORE_SENSITIVITY: f64 = 1.0;

fn categorical_values<'a>(column_name: &str, column: &'a Column) -> Result<&'a [String]> {
    column.as_categorical().ok_or_else(|| {
        DpError::column_type(
            column_name,
            format!(
                "the exponential mechanism needs a categorical column, found {}",
                column.kind()
            ),
        )
    })
}

/// Exponential mechanism with an indicator scoring function.
#[derive(Clone, Debug, PartialEq)]
pub struct ExponentialMechanism {
    /// Privacy budget.
    pub epsilon: f64,
}

impl ExponentialMechanism {
    /// Create a new exponential mechanism.
    pub fn new(epsilon: f64) -> Result<Self> {
        check_epsilon(epsilon)?;
        Ok(Self { epsilon })
    }

    fn score(value: &str, category: &str) -> f64 {
        if value == category {
            1.0
        } else {
            0.0
        }
    }

    /// Selection probabilities over `categories` for a true `value`.
    pub fn selection_probabilities<S: AsRef<str>>(
        &self,
        categories: &[S],
        value: &str,
    ) -> Vec<f64> {
        let scores: Vec<f64> = categories
            .iter()
            .map(|c| Self::score(value, c.as_ref()))
            .collect();
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Shift by the max score so large budgets cannot overflow.
        let weights: Vec<f64> = scores
            .iter()
            .map(|s| (self.epsilon * (s - max) / (2.0 * SCORE_SENSITIVITY)).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }

    /// Privatize a sequence of labels against its own alphabet.
    pub fn privatize_values<S: AsRef<str>, R: Rng + ?Sized>(
        &self,
        values: &[S],
        rng: &mut R,
    ) -> Result<Vec<String>> {
        let categories = alphabet(values);
        // One sampler per category; the distribution only depends on the true label.
        let samplers = categories
            .iter()
            .map(|c| {
                WeightedIndex::new(self.selection_probabilities(&categories, c))
                    .map_err(|e| DpError::numerical(format!("invalid selection weights: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        values
            .iter()
            .map(|v| {
                let idx = categories
                    .binary_search_by(|c| c.as_str().cmp(v.as_ref()))
                    .map_err(|_| DpError::numerical("value missing from its own alphabet"))?;
                Ok(categories[samplers[idx].sample(rng)].clone())
            })
            .collect()
    }
}

impl ColumnMechanism for ExponentialMechanism {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn privatize<R: Rng + ?Sized>(
        &self,
        column_name: &str,
        column: &Column,
        rng: &mut R,
    ) -> Result<Column> {
        let values = categorical_values(column_name, column)?;
        tracing::debug!(
            target: "ldp::mechanism",
            mechanism = "exponential",
            column = column_name,
            epsilon = self.epsilon,
            "sampling categories"
        );
        self.privatize_values(values, rng).map(Column::Categorical)
    }
}

/// Apply the exponential mechanism to a categorical column.
pub fn apply_exponential<R: Rng + ?Sized>(
    dataset: &Dataset,
    column: &str,
    epsilon: f64,
    placement: OutputPlacement,
    rng: &mut R,
) -> Result<Dataset> {
    categorical_values(column, dataset.column(column)?)?;
    ExponentialMechanism::new(epsilon)?.apply(dataset, column, placement, rng)
}

/// Apply the exponential mechanism to a bare sequence of labels.
///
/// Returns a sequence of the same length; the alphabet is the set of
/// distinct input labels.
pub fn apply_exponential_sequence<S: AsRef<str>, R: Rng + ?Sized>(
    values: &[S],
    epsilon: f64,
    rng: &mut R,
) -> Result<Vec<String>> {
    ExponentialMechanism::new(epsilon)?.privatize_values(values, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const EDUCATION: [&str; 4] = ["Bachelors", "HS-grad", "Masters", "Doctorate"];

    #[test]
    fn probabilities_follow_closed_form() {
        let mech = ExponentialMechanism::new(2.0).expect("valid");
        let probs = mech.selection_probabilities(&EDUCATION, "Masters");
        let e = 1.0f64.exp();
        let expected_true = e / (e + 3.0);
        assert!((probs[2] - expected_true).abs() < 1e-12);
        assert!((probs[0] - 1.0 / (e + 3.0)).abs() < 1e-12);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn large_budget_keeps_true_value() {
        let mech = ExponentialMechanism::new(1e4).expect("valid");
        let probs = mech.selection_probabilities(&EDUCATION, "HS-grad");
        assert!(probs[1] > 1.0 - 1e-12);
        assert!(probs.iter().all(|p| p.is_finite()));

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let out = mech.privatize_values(&EDUCATION, &mut rng).expect("valid");
        assert_eq!(out, EDUCATION.to_vec());
    }

    #[test]
    fn tiny_budget_is_nearly_uniform() {
        let mech = ExponentialMechanism::new(1e-9).expect("valid");
        let probs = mech.selection_probabilities(&EDUCATION, "Bachelors");
        for p in probs {
            assert!((p - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn empirical_retention_matches() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let values: Vec<&str> = EDUCATION.iter().copied().cycle().take(20_000).collect();
        let out = apply_exponential_sequence(&values, 2.0, &mut rng).expect("valid");
        let kept = out
            .iter()
            .zip(&values)
            .filter(|(a, b)| a.as_str() == **b)
            .count() as f64
            / values.len() as f64;
        let e = 1.0f64.exp();
        assert!((kept - e / (e + 3.0)).abs() < 0.02);
    }

    #[test]
    fn sequence_edge_cases() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let empty: Vec<String> = Vec::new();
        assert!(apply_exponential_sequence(&empty, 1.0, &mut rng)
            .expect("valid")
            .is_empty());
        assert!(matches!(
            apply_exponential_sequence(&["a", "b"], 0.0, &mut rng),
            Err(DpError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn column_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ds = Dataset::from_columns([
            ("age", Column::Integer(vec![20, 30])),
            ("education", Column::from(vec!["HS-grad", "Masters"])),
        ])
        .expect("valid");
        let inplace = OutputPlacement::InPlace;
        assert!(matches!(
            apply_exponential(&ds, "educatin", 1.0, inplace, &mut rng),
            Err(DpError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            apply_exponential(&ds, "age", 1.0, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
        assert!(matches!(
            apply_exponential(&ds, "education", -1.0, inplace, &mut rng),
            Err(DpError::InvalidParameter { .. })
        ));
        assert!(matches!(
            apply_exponential(&ds, "age", 0.0, inplace, &mut rng),
            Err(DpError::InvalidColumnType { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

        #[test]
        fn prop_output_stays_in_alphabet(
            idx in prop::collection::vec(0usize..4, 1..64),
            epsilon in 0.001f64..20.0,
            seed in any::<u64>(),
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let values: Vec<&str> = idx.iter().map(|&i| EDUCATION[i]).collect();
            let observed = alphabet(&values);
            let out = apply_exponential_sequence(&values, epsilon, &mut rng).expect("valid");
            prop_assert_eq!(out.len(), values.len());
            prop_assert!(out.iter().all(|v| observed.contains(v)));
        }
    }
}
