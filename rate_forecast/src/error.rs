//! Error types for the rate_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the rate_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series is too short for the requested window or fold layout
    #[error("Insufficient data for {context}: need at least {needed} observations, got {got}")]
    InsufficientData {
        /// Minimum number of observations required
        needed: usize,
        /// Number of observations supplied
        got: usize,
        /// What was being attempted
        context: String,
    },

    /// Two sequences that must be aligned have different lengths
    #[error("Shape mismatch: expected length {expected}, got {got}")]
    ShapeMismatch {
        /// Length of the reference sequence
        expected: usize,
        /// Length of the offending sequence
        got: usize,
    },

    /// Non-finite values or a diverging fit
    #[error("Numerical fault: {0}")]
    NumericalFault(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or parsing
    #[error("Data error: {0}")]
    DataError(String),

    /// Training was aborted by a cancellation token or deadline
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Error from CSV writing
    #[error("CSV error: {0}")]
    CsvError(String),
}

impl ForecastError {
    /// Shorthand for an [`ForecastError::InsufficientData`] error
    pub fn insufficient(needed: usize, got: usize, context: impl Into<String>) -> Self {
        ForecastError::InsufficientData {
            needed,
            got,
            context: context.into(),
        }
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::JsonError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}
