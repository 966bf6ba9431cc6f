//! Local differential privacy mechanisms for tabular data.
//!
//! Each mechanism privatizes one column of a [`Dataset`] and returns a new
//! dataset, either overwriting the source column or writing `dp_<column>`.
//! Randomness is always injected by the caller as an [`rand::Rng`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clipping;
pub mod dataset;
pub mod error;
pub mod exponential;
pub mod mechanism;
pub mod noise;
pub mod randomized_response;

pub use clipping::{clip_column, clip_values, Bounds, ClipReport, ClippedColumn, ResolvedBounds};
pub use dataset::{
    alphabet, dp_column_name, Column, ColumnKind, Dataset, NamedColumn, OutputPlacement, Value,
    DP_PREFIX,
};
pub use error::{check_delta, check_epsilon, DpError, Result};
pub use exponential::{apply_exponential, apply_exponential_sequence, ExponentialMechanism};
pub use mechanism::ColumnMechanism;
pub use noise::{
    add_gaussian_noise, add_laplace_noise, apply_gaussian, apply_laplace, GaussianMechanism,
    LaplaceMechanism, DEFAULT_DELTA,
};
pub use randomized_response::{
    apply_randomized_response_binary, apply_randomized_response_kary, BinaryRandomizedResponse,
    KaryRandomizedResponse,
};

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::{
        apply_exponential, apply_exponential_sequence, apply_gaussian, apply_laplace,
        apply_randomized_response_binary, apply_randomized_response_kary,
        BinaryRandomizedResponse, Bounds, Column, ColumnKind, ColumnMechanism, Dataset, DpError,
        ExponentialMechanism, GaussianMechanism, KaryRandomizedResponse, LaplaceMechanism,
        OutputPlacement, Result, DEFAULT_DELTA,
    };
}
