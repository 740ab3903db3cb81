//! Error types for the decomp-arima library.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while learning, transforming, forecasting or validating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Malformed configuration or an empty input range.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation needs a pipeline stage that has not been reached.
    #[error("not learned: {0}")]
    NotLearned(String),

    /// A date lies outside the range a transform branch is valid for.
    /// `last == None` means the range is open-ended.
    #[error("date {date} outside allowed range {}", display_bounds(.first, .last))]
    OutOfRange {
        date: NaiveDate,
        first: NaiveDate,
        last: Option<NaiveDate>,
    },

    /// Numerically invalid learned or supplied parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Two series that must share a date range do not.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

fn display_bounds(first: &NaiveDate, last: &Option<NaiveDate>) -> String {
    match last {
        Some(last) => format!("[{first}, {last}]"),
        None => format!("[{first}, ..)"),
    }
}
