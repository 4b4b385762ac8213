//! Core error types for `fleetwake`.

use thiserror::Error;

/// Core error type for `fleetwake` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data in an API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
