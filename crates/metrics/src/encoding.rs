//! Shared integer encoding of categorical values.

use std::collections::HashMap;

use ldp_core::{Column, Value};

/// Integer codes assigned to values in order of first appearance.
#[derive(Clone, Debug, Default)]
pub struct CategoryEncoding {
    codes: HashMap<Value, usize>,
}

impl CategoryEncoding {
    /// Build one mapping from the union of the values of `columns`.
    pub fn fit<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = &'a Column>,
    {
        let mut codes = HashMap::new();
        for column in columns {
            for value in column.values() {
                let next = codes.len();
                codes.entry(value).or_insert(next);
            }
        }
        Self { codes }
    }

    /// Code of a value, if it was seen during fitting.
    pub fn code(&self, value: &Value) -> Option<usize> {
        self.codes.get(value).copied()
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether no values were seen.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Encode a column; unseen values become NaN.
    pub fn encode(&self, column: &Column) -> Vec<f64> {
        column
            .values()
            .map(|v| self.code(&v).map_or(f64::NAN, |c| c as f64))
            .collect()
    }
}

/// Numeric views of an original and a privatized column that can be
/// correlated against each other.
///
/// If either side is categorical both are encoded with one shared mapping,
/// otherwise the numbers are used as-is.
pub fn comparable_pair(original: &Column, privatized: &Column) -> (Vec<f64>, Vec<f64>) {
    match (original.to_f64(), privatized.to_f64()) {
        (Some(o), Some(p)) => (o, p),
        _ => {
            let encoding = CategoryEncoding::fit([original, privatized]);
            (encoding.encode(original), encoding.encode(privatized))
        }
    }
}
