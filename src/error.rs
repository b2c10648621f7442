//! Error types for boosting-insights

use thiserror::Error;

/// Result type alias for boosting-insights operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Main error type for the interpretation and lift toolkit
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Missing feature: model references '{0}' but the data has no such column")]
    MissingFeature(String),

    #[error("Invalid grid value for '{feature}': {value} ({reason})")]
    InvalidGridValue {
        feature: String,
        value: String,
        reason: String,
    },

    #[error("Degenerate importance: {0}")]
    DegenerateImportance(String),

    #[error("Interaction depth {depth} is too low for {requested} features")]
    InsufficientDepth { depth: usize, requested: usize },

    #[error("Unknown feature: '{0}' is not used by the model")]
    UnknownFeature(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for InsightError {
    fn from(err: polars::error::PolarsError) -> Self {
        InsightError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        InsightError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for InsightError {
    fn from(err: ndarray::ShapeError) -> Self {
        InsightError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
