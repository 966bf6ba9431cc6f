//! Value bounding for numeric columns.
//!
//! Additive-noise mechanisms need a bounded sensitivity. The bounds are
//! either supplied by the caller or taken from the observed range, and the
//! same interval is used to clip before and after noise is added so a
//! released value never leaves the declared domain.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::dataset::{Column, ColumnKind};
use crate::error::{DpError, Result};

/// Optional explicit bounds; missing ends are taken from the data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower clipping bound.
    #[serde(default)]
    pub lower: Option<f64>,
    /// Upper clipping bound.
    #[serde(default)]
    pub upper: Option<f64>,
}

impl Bounds {
    /// Create bounds from optional ends.
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// Derive both ends from the observed minimum and maximum.
    pub fn observed() -> Self {
        Self::default()
    }

    /// Fully explicit bounds.
    pub fn explicit(lower: f64, upper: f64) -> Self {
        Self::new(Some(lower), Some(upper))
    }

    /// Resolve against `values`, ignoring NaN cells when deriving ends.
    pub fn resolve(&self, values: &[f64]) -> Result<ResolvedBounds> {
        for bound in [self.lower, self.upper].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(DpError::invalid(format!("bounds must be finite, got {bound}")));
            }
        }

        let observed = || -> Result<(f64, f64)> {
            let mut finite = values.iter().copied().filter(|v| v.is_finite());
            let first = finite.next().ok_or_else(|| {
                DpError::invalid("cannot derive bounds from a column without finite values")
            })?;
            Ok(finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
        };

        let (lower, upper) = match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, observed()?.1),
            (None, Some(hi)) => (observed()?.0, hi),
            (None, None) => observed()?,
        };

        if lower > upper {
            return Err(DpError::invalid(format!(
                "lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(ResolvedBounds { lower, upper })
    }
}

/// Concrete clipping interval `[lower, upper]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedBounds {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl ResolvedBounds {
    /// Range-based sensitivity, `upper - lower`.
    pub fn sensitivity(&self) -> f64 {
        self.upper - self.lower
    }

    /// Clamp a single value. NaN passes through.
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }

    /// Shrink to the integers inside the interval.
    pub fn integral(self) -> Result<Self> {
        let lower = self.lower.ceil();
        let upper = self.upper.floor();
        if lower > upper {
            return Err(DpError::invalid(format!(
                "bounds [{}, {}] contain no integer",
                self.lower, self.upper
            )));
        }
        Ok(Self { lower, upper })
    }
}

/// Result of a clipping operation.
#[derive(Clone, Debug)]
pub struct ClipReport {
    /// Interval the values were clipped into.
    pub bounds: ResolvedBounds,
    /// Number of values moved by clipping.
    pub clipped: usize,
}

/// Clip values into `bounds` in-place and return how many changed.
pub fn clip_values(values: &mut Array1<f64>, bounds: &ResolvedBounds) -> usize {
    let mut clipped = 0usize;
    values.mapv_inplace(|x| {
        let y = bounds.clamp(x);
        if y != x && !x.is_nan() {
            clipped += 1;
        }
        y
    });
    clipped
}

/// A numeric column widened to `f64` and clipped into its bounds.
#[derive(Clone, Debug)]
pub struct ClippedColumn {
    /// Clipped values.
    pub values: Array1<f64>,
    /// Kind of the source column.
    pub kind: ColumnKind,
    /// Clipping summary.
    pub report: ClipReport,
}

impl ClippedColumn {
    /// Convert noisy values back to the source kind, re-clipping them.
    ///
    /// Integer columns are rounded half-to-even before the final clip.
    pub fn finish(&self, mut noisy: Array1<f64>) -> Column {
        let bounds = self.report.bounds;
        match self.kind {
            ColumnKind::Integer => Column::Integer(
                noisy
                    .iter()
                    .map(|&x| bounds.clamp(x.round_ties_even()) as i64)
                    .collect(),
            ),
            _ => {
                clip_values(&mut noisy, &bounds);
                Column::Float(noisy.to_vec())
            }
        }
    }
}

/// Resolve bounds for a numeric column and clip it.
pub fn clip_column(name: &str, column: &Column, bounds: Bounds) -> Result<ClippedColumn> {
    let raw = column.to_f64().ok_or_else(|| {
        DpError::column_type(
            name,
            format!("expected a numeric column, found {}", column.kind()),
        )
    })?;

    let mut resolved = bounds.resolve(&raw)?;
    if column.kind() == ColumnKind::Integer {
        resolved = resolved.integral()?;
    }

    let mut values = Array1::from_vec(raw);
    let clipped = clip_values(&mut values, &resolved);
    tracing::debug!(
        target: "ldp::clipping",
        column = name,
        lower = resolved.lower,
        upper = resolved.upper,
        clipped,
        "clipped column"
    );

    Ok(ClippedColumn {
        values,
        kind: column.kind(),
        report: ClipReport {
            bounds: resolved,
            clipped,
        },
    })
}
