//! Facade crate re-exporting the mechanisms, metrics and release plans.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod plan;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use ldp_core as core;
pub use ldp_metrics as metrics;

pub use ldp_core::{
    alphabet, apply_exponential, apply_exponential_sequence, apply_gaussian, apply_laplace,
    apply_randomized_response_binary, apply_randomized_response_kary, BinaryRandomizedResponse,
    Bounds, Column, ColumnKind, ColumnMechanism, Dataset, DpError, ExponentialMechanism,
    GaussianMechanism, KaryRandomizedResponse, LaplaceMechanism, OutputPlacement, Result, Value,
    DEFAULT_DELTA,
};
pub use ldp_metrics::{correlation_loss, divergence, CorrelationMethod, Divergence};
pub use plan::{MechanismConfig, ReleasePlan, ReleaseStep, UtilityReport};

/// Convenience prelude covering mechanisms, metrics and plans.
pub mod prelude {
    pub use crate::plan::{MechanismConfig, ReleasePlan, ReleaseStep, UtilityReport};
    pub use ldp_core::prelude::*;
    pub use ldp_metrics::prelude::*;
}
