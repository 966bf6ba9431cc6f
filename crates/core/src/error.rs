//! Error types for local differential privacy operations.

/// Errors that can occur while privatizing or evaluating a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DpError {
    /// The referenced column does not exist.
    #[error("column `{column}` not found in the dataset")]
    ColumnNotFound {
        /// Name of the missing column.
        column: String,
    },

    /// The column's kind or cardinality does not suit the mechanism.
    #[error("column `{column}` has an invalid type: {msg}")]
    InvalidColumnType {
        /// Name of the offending column.
        column: String,
        /// Human-readable error description.
        msg: String,
    },

    /// Invalid parameter provided.
    #[error("invalid parameter: {msg}")]
    InvalidParameter {
        /// Human-readable error description.
        msg: String,
    },

    /// A metric was requested over features missing from one side.
    #[error("invalid feature set: {msg}")]
    InvalidFeatureSet {
        /// Human-readable error description.
        msg: String,
    },

    /// A column's row count differs from the rest of the dataset.
    #[error("column `{column}` has {found} rows, expected {expected}")]
    ShapeMismatch {
        /// Name of the offending column.
        column: String,
        /// Row count of the dataset.
        expected: usize,
        /// Row count of the column.
        found: usize,
    },

    /// Numerical computation error.
    #[error("numerical error: {msg}")]
    NumericalError {
        /// Human-readable error description.
        msg: String,
    },

    /// Configuration error.
    #[error("configuration error: {msg}")]
    ConfigError {
        /// Human-readable error description.
        msg: String,
    },
}

/// Result type for LDP operations.
pub type Result<T> = std::result::Result<T, DpError>;

impl DpError {
    /// Create a column-not-found error.
    pub fn column_not_found<S: Into<String>>(column: S) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Create an invalid column type error.
    pub fn column_type<C: Into<String>, S: Into<String>>(column: C, msg: S) -> Self {
        Self::InvalidColumnType {
            column: column.into(),
            msg: msg.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter { msg: msg.into() }
    }

    /// Create an invalid feature set error.
    pub fn feature_set<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFeatureSet { msg: msg.into() }
    }

    /// Create a numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::NumericalError { msg: msg.into() }
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError { msg: msg.into() }
    }
}

/// Validate a privacy budget.
pub fn check_epsilon(epsilon: f64) -> Result<()> {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(DpError::invalid(format!(
            "epsilon must be finite and greater than 0, got {epsilon}"
        )));
    }
    Ok(())
}

/// Validate a failure probability for approximate DP.
pub fn check_delta(delta: f64) -> Result<()> {
    if !delta.is_finite() || delta <= 0.0 || delta >= 1.0 {
        return Err(DpError::invalid(format!(
            "delta must lie in the open interval (0, 1), got {delta}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_must_be_positive() {
        assert!(check_epsilon(1.0).is_ok());
        assert!(matches!(
            check_epsilon(0.0),
            Err(DpError::InvalidParameter { .. })
        ));
        assert!(check_epsilon(-1.0).is_err());
        assert!(check_epsilon(f64::NAN).is_err());
        assert!(check_epsilon(f64::INFINITY).is_err());
    }

    #[test]
    fn delta_must_be_open_unit_interval() {
        assert!(check_delta(1e-3).is_ok());
        assert!(check_delta(0.0).is_err());
        assert!(check_delta(1.0).is_err());
        assert!(check_delta(1.1).is_err());
        assert!(check_delta(-1.1).is_err());
    }

    #[test]
    fn messages_name_the_column() {
        let err = DpError::column_not_found("educatin");
        assert_eq!(err.to_string(), "column `educatin` not found in the dataset");
    }
}
