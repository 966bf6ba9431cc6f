//! Declarative release plans.
//!
//! A plan lists which mechanism to run on which column. It is usually
//! loaded from YAML:
//!
//! ```yaml
//! steps:
//!   - column: age
//!     mechanism: { kind: laplace, epsilon: 1.0, lower: 17, upper: 90 }
//!   - column: sex
//!     write_new_column: true
//!     mechanism: { kind: randomized_response_binary, epsilon: 1.0, positive_label: Female }
//! ```
//!
//! Steps run in order and each step sees the output of the previous one.
//! Plans do not track or compose privacy budgets.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use ldp_core::{
    apply_exponential, apply_gaussian, apply_laplace, apply_randomized_response_binary,
    apply_randomized_response_kary, BinaryRandomizedResponse, Bounds, Dataset, DpError,
    ExponentialMechanism, GaussianMechanism, KaryRandomizedResponse, LaplaceMechanism,
    OutputPlacement, Result, DEFAULT_DELTA,
};
use ldp_metrics::{correlation_loss, divergence, CorrelationMethod, Divergence};
use rand::Rng;
use serde::{Deserialize, Serialize};

fn default_delta() -> f64 {
    DEFAULT_DELTA
}

/// Mechanism and parameters of one release step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum MechanismConfig {
    /// Laplace mechanism.
    Laplace {
        /// Privacy budget.
        epsilon: f64,
        /// Lower clipping bound.
        #[serde(default)]
        lower: Option<f64>,
        /// Upper clipping bound.
        #[serde(default)]
        upper: Option<f64>,
    },
    /// Gaussian mechanism.
    Gaussian {
        /// Privacy budget.
        epsilon: f64,
        /// Failure probability.
        #[serde(default = "default_delta")]
        delta: f64,
        /// Lower clipping bound.
        #[serde(default)]
        lower: Option<f64>,
        /// Upper clipping bound.
        #[serde(default)]
        upper: Option<f64>,
    },
    /// Exponential mechanism.
    Exponential {
        /// Privacy budget.
        epsilon: f64,
    },
    /// Binary randomized response.
    RandomizedResponseBinary {
        /// Privacy budget.
        epsilon: f64,
        /// Label encoded as the positive outcome.
        #[serde(default)]
        positive_label: Option<String>,
    },
    /// K-ary randomized response.
    RandomizedResponseKary {
        /// Privacy budget.
        epsilon: f64,
    },
}

impl MechanismConfig {
    /// Short mechanism name.
    pub fn name(&self) -> &'static str {
        match self {
            MechanismConfig::Laplace { .. } => "laplace",
            MechanismConfig::Gaussian { .. } => "gaussian",
            MechanismConfig::Exponential { .. } => "exponential",
            MechanismConfig::RandomizedResponseBinary { .. } => "randomized_response_binary",
            MechanismConfig::RandomizedResponseKary { .. } => "randomized_response_kary",
        }
    }

    /// Privacy budget of this step.
    pub fn epsilon(&self) -> f64 {
        match *self {
            MechanismConfig::Laplace { epsilon, .. }
            | MechanismConfig::Gaussian { epsilon, .. }
            | MechanismConfig::Exponential { epsilon }
            | MechanismConfig::RandomizedResponseBinary { epsilon, .. }
            | MechanismConfig::RandomizedResponseKary { epsilon } => epsilon,
        }
    }

    /// Check the parameters without touching any data.
    pub fn validate(&self) -> Result<()> {
        match self {
            MechanismConfig::Laplace { epsilon, lower, upper } => {
                LaplaceMechanism::new(*epsilon)?;
                check_bounds(*lower, *upper)
            }
            MechanismConfig::Gaussian {
                epsilon,
                delta,
                lower,
                upper,
            } => {
                GaussianMechanism::new(*epsilon, *delta)?;
                check_bounds(*lower, *upper)
            }
            MechanismConfig::Exponential { epsilon } => {
                ExponentialMechanism::new(*epsilon).map(drop)
            }
            MechanismConfig::RandomizedResponseBinary { epsilon, .. } => {
                BinaryRandomizedResponse::new(*epsilon).map(drop)
            }
            MechanismConfig::RandomizedResponseKary { epsilon } => {
                KaryRandomizedResponse::new(*epsilon).map(drop)
            }
        }
    }

    /// Run the mechanism on `column` of `dataset`.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        dataset: &Dataset,
        column: &str,
        placement: OutputPlacement,
        rng: &mut R,
    ) -> Result<Dataset> {
        match self {
            MechanismConfig::Laplace { epsilon, lower, upper } => apply_laplace(
                dataset,
                column,
                *epsilon,
                Bounds::new(*lower, *upper),
                placement,
                rng,
            ),
            MechanismConfig::Gaussian {
                epsilon,
                delta,
                lower,
                upper,
            } => apply_gaussian(
                dataset,
                column,
                *epsilon,
                *delta,
                Bounds::new(*lower, *upper),
                placement,
                rng,
            ),
            MechanismConfig::Exponential { epsilon } => {
                apply_exponential(dataset, column, *epsilon, placement, rng)
            }
            MechanismConfig::RandomizedResponseBinary {
                epsilon,
                positive_label,
            } => apply_randomized_response_binary(
                dataset,
                column,
                *epsilon,
                positive_label.as_deref(),
                placement,
                rng,
            ),
            MechanismConfig::RandomizedResponseKary { epsilon } => {
                apply_randomized_response_kary(dataset, column, *epsilon, placement, rng)
            }
        }
    }
}

fn check_bounds(lower: Option<f64>, upper: Option<f64>) -> Result<()> {
    for bound in [lower, upper].into_iter().flatten() {
        if !bound.is_finite() {
            return Err(DpError::invalid(format!("bounds must be finite, got {bound}")));
        }
    }
    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo > hi {
            return Err(DpError::invalid(format!(
                "lower bound {lo} exceeds upper bound {hi}"
            )));
        }
    }
    Ok(())
}

/// One column to privatize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseStep {
    /// Source column.
    pub column: String,
    /// Mechanism to apply.
    pub mechanism: MechanismConfig,
    /// Write to `dp_<column>` instead of overwriting the source.
    #[serde(default)]
    pub write_new_column: bool,
}

impl ReleaseStep {
    /// Where the step writes its output.
    pub fn placement(&self) -> OutputPlacement {
        OutputPlacement::from_flag(self.write_new_column)
    }

    /// Name of the column the step writes.
    pub fn output_column(&self) -> String {
        self.placement().target_name(&self.column)
    }
}

/// An ordered list of release steps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleasePlan {
    /// Steps in execution order.
    pub steps: Vec<ReleaseStep>,
}

impl ReleasePlan {
    /// Parse a plan from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| DpError::config(format!("invalid YAML plan: {e}")))
    }

    /// Parse a plan from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DpError::config(format!("invalid JSON plan: {e}")))
    }

    /// Load a plan from a `.yaml`, `.yml` or `.json` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DpError::config(format!("cannot read {}: {e}", path.display())))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(DpError::config(format!(
                "unsupported plan format for {} (expected .yaml, .yml or .json)",
                path.display()
            ))),
        }
    }

    /// Check every step's parameters and that no two steps write the same
    /// column.
    pub fn validate(&self) -> Result<()> {
        let mut outputs = HashSet::new();
        for (idx, step) in self.steps.iter().enumerate() {
            step.mechanism.validate()?;
            let output = step.output_column();
            if !outputs.insert(output.clone()) {
                return Err(DpError::config(format!(
                    "step {idx} writes column `{output}` which an earlier step already wrote"
                )));
            }
        }
        Ok(())
    }

    /// Run every step on a copy of `dataset`.
    pub fn apply<R: Rng + ?Sized>(&self, dataset: &Dataset, rng: &mut R) -> Result<Dataset> {
        self.validate()?;
        let mut current = dataset.clone();
        for (idx, step) in self.steps.iter().enumerate() {
            tracing::info!(
                target: "ldp::plan",
                step = idx,
                column = %step.column,
                mechanism = step.mechanism.name(),
                epsilon = step.mechanism.epsilon(),
                output = %step.output_column(),
                "applying release step"
            );
            current = step
                .mechanism
                .apply(&current, &step.column, step.placement(), rng)?;
        }
        tracing::info!(
            target: "ldp::plan",
            steps = self.steps.len(),
            rows = current.n_rows(),
            "release plan applied"
        );
        Ok(current)
    }
}

/// Utility of a privatized dataset relative to the original.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UtilityReport {
    /// Distribution divergence per privatized column.
    pub divergences: BTreeMap<String, Divergence>,
    /// Method used for the correlation loss.
    pub correlation_method: CorrelationMethod,
    /// Correlation loss (%) over the plan's numeric columns, if at least two.
    pub correlation_loss: Option<f64>,
}

impl UtilityReport {
    /// Evaluate the output of `plan`.
    pub fn evaluate(
        plan: &ReleasePlan,
        original: &Dataset,
        privatized: &Dataset,
        method: CorrelationMethod,
    ) -> Result<Self> {
        let mut divergences = BTreeMap::new();
        let mut numeric = Vec::new();
        for step in &plan.steps {
            let d = divergence(original, privatized, &step.column, step.placement())?;
            divergences.insert(step.output_column(), d);
            if original.column(&step.column)?.is_numeric() && !numeric.contains(&step.column) {
                numeric.push(step.column.clone());
            }
        }

        let placement = if plan.steps.iter().any(|s| s.write_new_column) {
            OutputPlacement::NewColumn
        } else {
            OutputPlacement::InPlace
        };
        let correlation_loss = if numeric.len() >= 2 {
            Some(correlation_loss(
                original, privatized, &numeric, method, placement,
            )?)
        } else {
            None
        };

        Ok(Self {
            divergences,
            correlation_method: method,
            correlation_loss,
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DpError::config(format!("cannot serialize report: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
steps:
  - column: age
    mechanism: { kind: laplace, epsilon: 1.0, lower: 17, upper: 90 }
  - column: hours
    write_new_column: true
    mechanism: { kind: gaussian, epsilon: 2.0 }
  - column: sex
    mechanism: { kind: randomized_response_binary, epsilon: 1.0, positive_label: Female }
"#;

    #[test]
    fn parses_yaml_with_defaults() {
        let plan = ReleasePlan::from_yaml_str(PLAN).expect("valid plan");
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(
            plan.steps[1].mechanism,
            MechanismConfig::Gaussian {
                epsilon: 2.0,
                delta: DEFAULT_DELTA,
                lower: None,
                upper: None
            }
        );
        assert_eq!(plan.steps[1].output_column(), "dp_hours");
        assert!(!plan.steps[0].write_new_column);
        plan.validate().expect("valid parameters");
    }

    #[test]
    fn json_and_yaml_agree() {
        let yaml = ReleasePlan::from_yaml_str(PLAN).expect("valid plan");
        let json = serde_json::to_string(&yaml).expect("serialize");
        assert_eq!(ReleasePlan::from_json_str(&json).expect("valid plan"), yaml);
    }

    #[test]
    fn unknown_mechanism_is_a_config_error() {
        let bad = "steps:\n  - column: age\n    mechanism: { kind: geometric, epsilon: 1.0 }\n";
        assert!(matches!(
            ReleasePlan::from_yaml_str(bad),
            Err(DpError::ConfigError { .. })
        ));
    }

    #[test]
    fn validation_catches_bad_parameters() {
        let plan = ReleasePlan {
            steps: vec![ReleaseStep {
                column: "age".into(),
                mechanism: MechanismConfig::Gaussian {
                    epsilon: 1.0,
                    delta: 1.5,
                    lower: None,
                    upper: None,
                },
                write_new_column: false,
            }],
        };
        assert!(matches!(
            plan.validate(),
            Err(DpError::InvalidParameter { .. })
        ));

        let inverted = MechanismConfig::Laplace {
            epsilon: 1.0,
            lower: Some(10.0),
            upper: Some(1.0),
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn duplicate_outputs_rejected() {
        let step = ReleaseStep {
            column: "sex".into(),
            mechanism: MechanismConfig::Exponential { epsilon: 1.0 },
            write_new_column: false,
        };
        let plan = ReleasePlan {
            steps: vec![step.clone(), step],
        };
        assert!(matches!(plan.validate(), Err(DpError::ConfigError { .. })));
    }

    #[test]
    fn unsupported_extension_rejected() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let path = tmp.path().join("plan.toml");
        std::fs::write(&path, PLAN).expect("write plan");
        assert!(matches!(
            ReleasePlan::from_path(&path),
            Err(DpError::ConfigError { .. })
        ));
    }
}
