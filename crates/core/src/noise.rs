//! Additive noise mechanisms for numeric columns.

use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};

use crate::clipping::{clip_column, Bounds};
use crate::dataset::{Column, Dataset, OutputPlacement};
use crate::error::{check_delta, check_epsilon, DpError, Result};
use crate::mechanism::ColumnMechanism;

/// Default failure probability of the Gaussian mechanism.
pub const DEFAULT_DELTA: f64 = 1e-3;

/// Add Gaussian noise to each finite value in-place.
pub fn add_gaussian_noise<R: Rng + ?Sized>(values: &mut Array1<f64>, sigma: f64, rng: &mut R) {
    if !sigma.is_finite() || sigma <= 0.0 || values.is_empty() {
        return;
    }

    let dist = match Normal::new(0.0, sigma) {
        Ok(d) => d,
        Err(_) => return,
    };

    values.mapv_inplace(|x| if x.is_finite() { x + dist.sample(rng) } else { x });
}

/// Add Laplace noise to each finite value in-place.
pub fn add_laplace_noise<R: Rng + ?Sized>(values: &mut Array1<f64>, scale: f64, rng: &mut R) {
    if !scale.is_finite() || scale <= 0.0 || values.is_empty() {
        return;
    }

    // Laplace noise can be sampled as the difference of two exponentials.
    let lambda = 1.0 / scale;
    let dist = match Exp::new(lambda) {
        Ok(d) => d,
        Err(_) => return,
    };

    values.mapv_inplace(|x| {
        if x.is_finite() {
            x + (dist.sample(rng) - dist.sample(rng))
        } else {
            x
        }
    });
}

/// Laplace mechanism with range-based sensitivity.
#[derive(Clone, Debug, PartialEq)]
pub struct LaplaceMechanism {
    /// Privacy budget.
    pub epsilon: f64,
    /// Clipping bounds; missing ends come from the column.
    pub bounds: Bounds,
}

impl LaplaceMechanism {
    /// Create a new Laplace mechanism with observed bounds.
    pub fn new(epsilon: f64) -> Result<Self> {
        check_epsilon(epsilon)?;
        Ok(Self {
            epsilon,
            bounds: Bounds::observed(),
        })
    }

    /// Use the given bounds.
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Laplace scale for a given sensitivity.
    pub fn scale(&self, sensitivity: f64) -> f64 {
        sensitivity / self.epsilon
    }
}

impl ColumnMechanism for LaplaceMechanism {
    fn name(&self) -> &'static str {
        "laplace"
    }

    fn privatize<R: Rng + ?Sized>(
        &self,
        column_name: &str,
        column: &Column,
        rng: &mut R,
    ) -> Result<Column> {
        let clipped = clip_column(column_name, column, self.bounds)?;
        let scale = self.scale(clipped.report.bounds.sensitivity());
        tracing::debug!(
            target: "ldp::mechanism",
            mechanism = "laplace",
            column = column_name,
            epsilon = self.epsilon,
            scale,
            "calibrated noise"
        );

        let mut noisy = clipped.values.clone();
        add_laplace_noise(&mut noisy, scale, rng);
        Ok(clipped.finish(noisy))
    }
}

/// Gaussian mechanism calibrated for (epsilon, delta)-DP.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianMechanism {
    /// Privacy budget.
    pub epsilon: f64,
    /// Failure probability.
    pub delta: f64,
    /// Clipping bounds; missing ends come from the column.
    pub bounds: Bounds,
}

impl GaussianMechanism {
    /// Create a new Gaussian mechanism with observed bounds.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self> {
        check_epsilon(epsilon)?;
        check_delta(delta)?;
        Ok(Self {
            epsilon,
            delta,
            bounds: Bounds::observed(),
        })
    }

    /// Use the given bounds.
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Noise multiplier, `sqrt(2 ln(1.25 / delta)) / epsilon`.
    pub fn noise_multiplier(&self) -> f64 {
        (2.0 * (1.25 / self.delta).ln()).sqrt() / self.epsilon
    }

    /// Noise standard deviation for a given sensitivity.
    pub fn sigma(&self, sensitivity: f64) -> f64 {
        sensitivity * self.noise_multiplier()
    }
}

impl ColumnMechanism for GaussianMechanism {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn privatize<R: Rng + ?Sized>(
        &self,
        column_name: &str,
        column: &Column,
        rng: &mut R,
    ) -> Result<Column> {
        let clipped = clip_column(column_name, column, self.bounds)?;
        let sigma = self.sigma(clipped.report.bounds.sensitivity());
        if !sigma.is_finite() {
            return Err(DpError::numerical(format!(
                "non-finite noise scale for column `{column_name}`"
            )));
        }
        tracing::debug!(
            target: "ldp::mechanism",
            mechanism = "gaussian",
            column = column_name,
            epsilon = self.epsilon,
            delta = self.delta,
            sigma,
            "calibrated noise"
        );

        let mut noisy = clipped.values.clone();
        add_gaussian_noise(&mut noisy, sigma, rng);
        Ok(clipped.finish(noisy))
    }
}

/// Apply the Laplace mechanism to a numeric column.
pub fn apply_laplace<R: Rng + ?Sized>(
    dataset: &Dataset,
    column: &str,
    epsilon: f64,
    bounds: Bounds,
    placement: OutputPlacement,
    rng: &mut R,
) -> Result<Dataset> {
    dataset.column(column)?;
    LaplaceMechanism::new(epsilon)?
        .with_bounds(bounds)
        .apply(dataset, column, placement, rng)
}

/// Apply the Gaussian mechanism to a numeric column.
pub fn apply_gaussian<R: Rng + ?Sized>(
    dataset: &Dataset,
    column: &str,
    epsilon: f64,
    delta: f64,
    bounds: Bounds,
    placement: OutputPlacement,
    rng: &mut R,
) -> Result<Dataset> {
    dataset.column(column)?;
    GaussianMechanism::new(epsilon, delta)?
        .with_bounds(bounds)
        .apply(dataset, column, placement, rng)
}
