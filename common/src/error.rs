//! Error types shared across the Tasas crates.

use thiserror::Error;

/// Main error type for shared Tasas operations.
#[derive(Error, Debug)]
pub enum TasasError {
    /// Currency code not known to the calculator.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Snapshot storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Snapshot (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TasasError {
    /// Get error code for log records.
    pub fn error_code(&self) -> &'static str {
        match self {
            TasasError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            TasasError::Storage(_) => "STORAGE_ERROR",
            TasasError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<std::io::Error> for TasasError {
    fn from(err: std::io::Error) -> Self {
        TasasError::Storage(err.to_string())
    }
}

/// Result type alias for shared Tasas operations.
pub type Result<T> = std::result::Result<T, TasasError>;
