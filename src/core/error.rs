//! Error types for FEDAGG.

use thiserror::Error;

/// Result type alias for FEDAGG operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in FEDAGG operations.
#[derive(Error, Debug)]
pub enum Error {
    // Ingestion errors
    #[error("validation failed: {0}")]
    Validation(String),

    // Privacy errors
    #[error("invalid privacy parameter: {0}")]
    InvalidParameter(String),

    // Aggregation errors
    #[error("dimension mismatch for model '{model}': expected {expected}, got {got}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        got: usize,
    },

    #[error("no updates to aggregate")]
    EmptyInput,

    // Round errors
    #[error("another aggregation round is already in progress")]
    ConcurrentRound,

    #[error("round not found: {0}")]
    RoundNotFound(u64),

    // Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    // Generic errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = Error::DimensionMismatch {
            model: "heart_rate".to_string(),
            expected: 4,
            got: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("heart_rate"));
        assert!(msg.contains("expected 4"));
    }

    #[test]
    fn test_concurrent_round_display() {
        let msg = Error::ConcurrentRound.to_string();
        assert!(msg.contains("in progress"));
    }
}
