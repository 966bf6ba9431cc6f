//! Correlation preservation between original and privatized datasets.

use std::fmt;
use std::str::FromStr;

use ldp_core::{Dataset, DpError, OutputPlacement, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, RankTieBreaker, Statistics};

use crate::encoding::comparable_pair;

/// Pairwise correlation coefficient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    #[default]
    Pearson,
    /// Kendall rank correlation (tau-b).
    Kendall,
    /// Spearman rank correlation.
    Spearman,
}

impl CorrelationMethod {
    /// Correlate two equally long samples. Returns NaN when undefined.
    pub fn correlate(self, x: &[f64], y: &[f64]) -> f64 {
        match self {
            CorrelationMethod::Pearson => pearson(x, y),
            CorrelationMethod::Kendall => kendall_tau_b(x, y),
            CorrelationMethod::Spearman => spearman(x, y),
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = DpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "kendall" => Ok(CorrelationMethod::Kendall),
            "spearman" => Ok(CorrelationMethod::Spearman),
            other => Err(DpError::invalid(format!(
                "unsupported correlation method `{other}` (expected pearson, kendall or spearman)"
            ))),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Kendall => "kendall",
            CorrelationMethod::Spearman => "spearman",
        };
        f.write_str(name)
    }
}

/// Drop pairs where either side is NaN.
fn complete_pairs(x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .unzip()
}

/// Pearson correlation over pairwise complete observations.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    if x.len() < 2 {
        return f64::NAN;
    }
    let mx = x.iter().mean();
    let my = y.iter().mean();

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(&y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Spearman correlation: Pearson over average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    let rx = Data::new(x).ranks(RankTieBreaker::Average);
    let ry = Data::new(y).ranks(RankTieBreaker::Average);
    pearson(&rx, &ry)
}

/// Number of pairs inside runs of equal neighbours of a sorted slice.
fn tied_pairs<T>(sorted: &[T], same: impl Fn(&T, &T) -> bool) -> u64 {
    let mut total = 0u64;
    let mut run = 1u64;
    for w in sorted.windows(2) {
        if same(&w[0], &w[1]) {
            run += 1;
        } else {
            total += run * (run - 1) / 2;
            run = 1;
        }
    }
    total + run * (run - 1) / 2
}

/// Bottom-up merge sort returning the number of inversions removed.
fn merge_sort_swaps(values: &mut [f64]) -> u64 {
    let n = values.len();
    let mut buf = values.to_vec();
    let mut swaps = 0u64;
    let mut width = 1;
    while width < n {
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                if values[j] < values[i] {
                    buf[k] = values[j];
                    swaps += (mid - i) as u64;
                    j += 1;
                } else {
                    buf[k] = values[i];
                    i += 1;
                }
                k += 1;
            }
            let rest = mid - i;
            buf[k..k + rest].copy_from_slice(&values[i..mid]);
            buf[k + rest..end].copy_from_slice(&values[j..end]);
            start = end;
        }
        values.copy_from_slice(&buf);
        width *= 2;
    }
    swaps
}

/// Kendall tau-b, accounting for ties on either side.
///
/// Knight's O(n log n) algorithm: sort by `(x, y)`, then count the
/// inversions left in `y` while merge-sorting it.
pub fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let (x, y) = complete_pairs(x, y);
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }

    let mut pairs: Vec<(f64, f64)> = x.into_iter().zip(y).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let tied_x = tied_pairs(&pairs, |a, b| a.0 == b.0);
    let tied_xy = tied_pairs(&pairs, |a, b| a.0 == b.0 && a.1 == b.1);

    let mut ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let swaps = merge_sort_swaps(&mut ys);
    let tied_y = tied_pairs(&ys, |a, b| a == b);

    let total = (n as u64) * (n as u64 - 1) / 2;
    let denom = (((total - tied_x) as f64) * ((total - tied_y) as f64)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let numerator =
        total as f64 - tied_x as f64 - tied_y as f64 + tied_xy as f64 - 2.0 * swaps as f64;
    numerator / denom
}

/// Correlation matrix of the given columns; the diagonal is 1.
pub fn correlation_matrix(columns: &[Vec<f64>], method: CorrelationMethod) -> Array2<f64> {
    let k = columns.len();
    let mut out = Array2::from_elem((k, k), 1.0);
    for i in 0..k {
        for j in (i + 1)..k {
            let r = method.correlate(&columns[i], &columns[j]);
            out[[i, j]] = r;
            out[[j, i]] = r;
        }
    }
    out
}

/// Name of `feature` in the privatized dataset.
fn privatized_name(privatized: &Dataset, feature: &str, placement: OutputPlacement) -> String {
    let derived = OutputPlacement::NewColumn.target_name(feature);
    if placement.writes_new_column() && privatized.contains(&derived) {
        derived
    } else {
        feature.to_owned()
    }
}

/// Utility loss (%) from the change in pairwise correlations.
///
/// Categorical features are encoded with codes shared by both datasets.
/// Returns `100 * mean(|orig - dp|) / mean(|orig|)` over the strictly
/// off-diagonal entries of the two correlation matrices. Pairs whose
/// correlation is undefined on either side are left out.
pub fn correlation_loss<S: AsRef<str>>(
    original: &Dataset,
    privatized: &Dataset,
    features: &[S],
    method: CorrelationMethod,
    placement: OutputPlacement,
) -> Result<f64> {
    let names: Vec<(&str, String)> = features
        .iter()
        .map(|f| {
            let f = f.as_ref();
            (f, privatized_name(privatized, f, placement))
        })
        .collect();

    let missing: Vec<String> = names
        .iter()
        .filter_map(|(orig, dp)| {
            if !original.contains(orig) {
                Some(format!("`{orig}` (original)"))
            } else if !privatized.contains(dp) {
                Some(format!("`{dp}` (privatized)"))
            } else {
                None
            }
        })
        .collect();
    if !missing.is_empty() {
        return Err(DpError::feature_set(format!(
            "features missing from the dataframes: {}",
            missing.join(", ")
        )));
    }

    if names.len() < 2 {
        return Ok(0.0);
    }

    let mut orig_cols = Vec::with_capacity(names.len());
    let mut dp_cols = Vec::with_capacity(names.len());
    for (orig, dp) in &names {
        let (o, d) = comparable_pair(original.column(orig)?, privatized.column(dp)?);
        orig_cols.push(o);
        dp_cols.push(d);
    }

    let corr_orig = correlation_matrix(&orig_cols, method);
    let corr_dp = correlation_matrix(&dp_cols, method);

    let mut diffs = Vec::new();
    let mut magnitudes = Vec::new();
    let mut undefined = 0usize;
    for ((i, j), &o) in corr_orig.indexed_iter() {
        if i == j {
            continue;
        }
        let d = corr_dp[[i, j]];
        if o.is_nan() || d.is_nan() {
            undefined += 1;
            continue;
        }
        diffs.push((o - d).abs());
        magnitudes.push(o.abs());
    }
    if undefined > 0 {
        tracing::warn!(
            target: "ldp::metrics",
            %method,
            undefined,
            "skipping undefined correlations"
        );
    }

    if diffs.is_empty() {
        return Ok(0.0);
    }
    let mean_diff = diffs.iter().mean();
    if mean_diff == 0.0 {
        return Ok(0.0);
    }
    let mean_orig = magnitudes.iter().mean();
    if mean_orig == 0.0 {
        return Err(DpError::numerical(
            "original features are uncorrelated; relative loss is undefined",
        ));
    }

    let loss = 100.0 * mean_diff / mean_orig;
    tracing::debug!(target: "ldp::metrics", %method, loss, "correlation loss");
    Ok(loss)
}
