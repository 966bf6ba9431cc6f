//! Utility metrics comparing an original dataset with its privatized copy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod correlation;
mod divergence;
mod encoding;

pub use correlation::{
    correlation_loss, correlation_matrix, kendall_tau_b, pearson, spearman, CorrelationMethod,
};
pub use divergence::{
    aligned_distributions, column_divergence, divergence, frequencies, js_divergence,
    kl_divergence, total_variation, Divergence,
};
pub use encoding::{comparable_pair, CategoryEncoding};

/// Common imports for utility metrics.
pub mod prelude {
    pub use crate::{correlation_loss, divergence, CorrelationMethod, Divergence};
}
