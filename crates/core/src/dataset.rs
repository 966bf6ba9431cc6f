//! Typed tabular datasets.
//!
//! A [`Dataset`] is an ordered list of named [`Column`]s that all share one
//! row count. Each column carries an explicit [`ColumnKind`] so mechanisms can
//! check compatibility once at their boundary instead of inspecting cells.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{DpError, Result};

/// Prefix of the derived column written by [`OutputPlacement::NewColumn`].
pub const DP_PREFIX: &str = "dp_";

/// Name of the derived column for `column`.
pub fn dp_column_name(column: &str) -> String {
    format!("{DP_PREFIX}{column}")
}

/// Declared kind of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Signed integers.
    Integer,
    /// Floating point numbers.
    Float,
    /// Unordered string labels.
    Categorical,
}

impl ColumnKind {
    /// Whether the kind holds numbers.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Categorical => "categorical",
        };
        f.write_str(name)
    }
}

/// A single column of values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Column {
    /// Integer column.
    Integer(Vec<i64>),
    /// Floating point column.
    Float(Vec<f64>),
    /// Categorical (string) column.
    Categorical(Vec<String>),
}

impl Column {
    /// Build a categorical column from anything string-like.
    pub fn categorical<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Column::Categorical(values.into_iter().map(Into::into).collect())
    }

    /// The column's kind tag.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Integer(_) => ColumnKind::Integer,
            Column::Float(_) => ColumnKind::Float,
            Column::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the column holds numbers.
    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Numeric values widened to `f64`, or `None` for categorical columns.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Column::Integer(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Column::Float(v) => Some(v.clone()),
            Column::Categorical(_) => None,
        }
    }

    /// Borrow the labels of a categorical column.
    pub fn as_categorical(&self) -> Option<&[String]> {
        match self {
            Column::Categorical(v) => Some(v),
            _ => None,
        }
    }

    /// Sorted, deduplicated labels of a categorical column.
    pub fn alphabet(&self) -> Option<Vec<String>> {
        self.as_categorical().map(alphabet)
    }

    /// Cell at `row` as an owned [`Value`].
    pub fn value(&self, row: usize) -> Option<Value> {
        match self {
            Column::Integer(v) => v.get(row).map(|&x| Value::Int(x)),
            Column::Float(v) => v.get(row).map(|&x| Value::Float(x)),
            Column::Categorical(v) => v.get(row).map(|s| Value::Text(s.clone())),
        }
    }

    /// Iterate over all cells as owned [`Value`]s.
    pub fn values(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        match self {
            Column::Integer(v) => Box::new(v.iter().map(|&x| Value::Int(x))),
            Column::Float(v) => Box::new(v.iter().map(|&x| Value::Float(x))),
            Column::Categorical(v) => Box::new(v.iter().cloned().map(Value::Text)),
        }
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Column::Integer(values)
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Float(values)
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::Categorical(values)
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::categorical(values)
    }
}

/// Sorted, deduplicated category alphabet of a slice of labels.
pub fn alphabet<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.as_ref())
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// An owned, totally ordered cell value.
///
/// Floats compare with [`f64::total_cmp`] so values can key ordered maps.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer cell.
    Int(i64),
    /// Float cell.
    Float(f64),
    /// Categorical cell.
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Float(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// Where a mechanism writes its output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPlacement {
    /// Overwrite the source column.
    #[default]
    InPlace,
    /// Write to `dp_<column>` and leave the source untouched.
    NewColumn,
}

impl OutputPlacement {
    /// Map the `write_new_column` flag to a placement.
    pub fn from_flag(write_new_column: bool) -> Self {
        if write_new_column {
            OutputPlacement::NewColumn
        } else {
            OutputPlacement::InPlace
        }
    }

    /// Whether output goes to a derived column.
    pub fn writes_new_column(self) -> bool {
        self == OutputPlacement::NewColumn
    }

    /// Name of the column receiving the output for `column`.
    pub fn target_name(self, column: &str) -> String {
        match self {
            OutputPlacement::InPlace => column.to_owned(),
            OutputPlacement::NewColumn => dp_column_name(column),
        }
    }
}

impl From<bool> for OutputPlacement {
    fn from(write_new_column: bool) -> Self {
        Self::from_flag(write_new_column)
    }
}

/// A column paired with its name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedColumn {
    /// Column name.
    pub name: String,
    /// Column data.
    pub column: Column,
}

/// An in-memory table of equally long, uniquely named columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NamedColumn>", into = "Vec<NamedColumn>")]
pub struct Dataset {
    columns: Vec<NamedColumn>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from `(name, column)` pairs.
    ///
    /// Fails on duplicate names or columns of differing length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut dataset = Self::new();
        for (name, column) in columns {
            let name = name.into();
            if dataset.contains(&name) {
                return Err(DpError::invalid(format!("duplicate column `{name}`")));
            }
            dataset.insert(name, column)?;
        }
        Ok(dataset)
    }

    /// Builder-style [`Dataset::insert`].
    pub fn with_column<S: Into<String>>(mut self, name: S, column: Column) -> Result<Self> {
        self.insert(name, column)?;
        Ok(self)
    }

    /// Insert a column, replacing an existing one of the same name in place.
    pub fn insert<S: Into<String>>(&mut self, name: S, column: Column) -> Result<()> {
        let name = name.into();
        let replacing = self.position(&name);
        let others = self.columns.len() - usize::from(replacing.is_some());
        if others > 0 {
            let expected = self.n_rows();
            if column.len() != expected {
                return Err(DpError::ShapeMismatch {
                    column: name,
                    expected,
                    found: column.len(),
                });
            }
        }
        match replacing {
            Some(idx) => self.columns[idx].column = column,
            None => self.columns.push(NamedColumn { name, column }),
        }
        Ok(())
    }

    /// Borrow a column if present.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|idx| &self.columns[idx].column)
    }

    /// Borrow a column, failing with [`DpError::ColumnNotFound`].
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get(name).ok_or_else(|| DpError::column_not_found(name))
    }

    /// Whether a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of rows (0 for a dataset without columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.column.len())
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Whether the dataset has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Iterate over `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|c| (c.name.as_str(), &c.column))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

impl TryFrom<Vec<NamedColumn>> for Dataset {
    type Error = DpError;

    fn try_from(columns: Vec<NamedColumn>) -> Result<Self> {
        Self::from_columns(columns.into_iter().map(|c| (c.name, c.column)))
    }
}

impl From<Dataset> for Vec<NamedColumn> {
    fn from(dataset: Dataset) -> Self {
        dataset.columns
    }
}
