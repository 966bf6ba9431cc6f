//! Divergence between the empirical distributions of a column before and
//! after privatization.

use std::collections::{BTreeMap, BTreeSet};

use ldp_core::{Column, Dataset, DpError, OutputPlacement, Result, Value};
use serde::{Deserialize, Serialize};

/// Divergence metrics between two distributions over the same support.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    /// Total variation distance.
    pub tvd: f64,
    /// Squared Jensen-Shannon distance (natural log).
    pub js: f64,
    /// Kullback-Leibler divergence of the privatized from the original.
    pub kl: f64,
}

/// Count occurrences of each value.
pub fn frequencies(column: &Column) -> BTreeMap<Value, usize> {
    let mut counts = BTreeMap::new();
    for value in column.values() {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Normalized distributions of two columns over the sorted union of their
/// values, zero-filled where a value is absent on one side.
pub fn aligned_distributions(
    original: &Column,
    privatized: &Column,
) -> Result<(Vec<Value>, Vec<f64>, Vec<f64>)> {
    if original.is_empty() || privatized.is_empty() {
        return Err(DpError::invalid(
            "cannot compare the distribution of an empty column",
        ));
    }
    let freq_p = frequencies(original);
    let freq_q = frequencies(privatized);
    let support: Vec<Value> = freq_p
        .keys()
        .chain(freq_q.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let normalize = |freq: &BTreeMap<Value, usize>, total: usize| -> Vec<f64> {
        support
            .iter()
            .map(|v| freq.get(v).copied().unwrap_or(0) as f64 / total as f64)
            .collect()
    };
    let p = normalize(&freq_p, original.len());
    let q = normalize(&freq_q, privatized.len());
    Ok((support, p, q))
}

/// Total variation distance, `0.5 * sum |p - q|`.
pub fn total_variation(p: &[f64], q: &[f64]) -> f64 {
    0.5 * p.iter().zip(q).map(|(a, b)| (a - b).abs()).sum::<f64>()
}

/// `sum p ln(p / q)`; infinite when `q` misses mass that `p` has.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(&a, &b)| match (a > 0.0, b > 0.0) {
            (false, _) => 0.0,
            (true, false) => f64::INFINITY,
            (true, true) => a * (a / b).ln(),
        })
        .sum()
}

/// Squared Jensen-Shannon distance with natural logarithms.
pub fn js_divergence(p: &[f64], q: &[f64]) -> f64 {
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| 0.5 * (a + b)).collect();
    (0.5 * kl_divergence(p, &m) + 0.5 * kl_divergence(q, &m)).max(0.0)
}

/// Divergence between the empirical distributions of two columns.
pub fn column_divergence(original: &Column, privatized: &Column) -> Result<Divergence> {
    let (_, p, q) = aligned_distributions(original, privatized)?;
    Ok(Divergence {
        tvd: total_variation(&p, &q),
        js: js_divergence(&p, &q),
        kl: kl_divergence(&p, &q),
    })
}

/// Divergence between `column` in `original` and its privatized counterpart
/// (`dp_<column>` under [`OutputPlacement::NewColumn`]).
pub fn divergence(
    original: &Dataset,
    privatized: &Dataset,
    column: &str,
    placement: OutputPlacement,
) -> Result<Divergence> {
    let orig = original.column(column)?;
    let dp_name = placement.target_name(column);
    let dp = privatized.column(&dp_name)?;

    let result = column_divergence(orig, dp)?;
    tracing::debug!(
        target: "ldp::metrics",
        column,
        privatized = %dp_name,
        tvd = result.tvd,
        js = result.js,
        kl = result.kl,
        "distribution divergence"
    );
    Ok(result)
}
