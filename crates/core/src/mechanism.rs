//! The interface shared by all column mechanisms.

use rand::Rng;

use crate::dataset::{Column, Dataset, OutputPlacement};
use crate::error::Result;

/// A randomized transformation of a single dataset column.
///
/// Implementors validate their parameters at construction; `privatize`
/// checks the column kind and must not produce partial output.
pub trait ColumnMechanism {
    /// Short mechanism name used in logs.
    fn name(&self) -> &'static str;

    /// Privatize one column. `column_name` is only used for error reporting.
    fn privatize<R: Rng + ?Sized>(
        &self,
        column_name: &str,
        column: &Column,
        rng: &mut R,
    ) -> Result<Column>;

    /// Privatize `column` of `dataset` and return the resulting dataset.
    ///
    /// The input is left untouched; all other columns are copied through.
    fn apply<R: Rng + ?Sized>(
        &self,
        dataset: &Dataset,
        column: &str,
        placement: OutputPlacement,
        rng: &mut R,
    ) -> Result<Dataset> {
        let source = dataset.column(column)?;
        let privatized = self.privatize(column, source, rng)?;
        let target = placement.target_name(column);
        tracing::debug!(
            target: "ldp::mechanism",
            mechanism = self.name(),
            column,
            output = %target,
            rows = privatized.len(),
            "privatized column"
        );
        let mut out = dataset.clone();
        out.insert(target, privatized)?;
        Ok(out)
    }
}
