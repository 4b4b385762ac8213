//! Store error types.

use fleetwake_fetch::FetchError;
use thiserror::Error;

/// Errors that can occur while reading or writing state files.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Another process holds the run lock.
    #[error("Another run holds the lock at {0}")]
    Locked(String),
}

impl StoreError {
    /// Returns true if the error means the file does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Errors from obtaining a valid access token.
///
/// All of them are fatal for the run: recovery needs out-of-band
/// re-authorization or operator attention.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential file, or it holds no refresh token.
    #[error("No refresh token in {0}; seed the credential file first")]
    Missing(String),

    /// The refresh grant failed.
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] FetchError),

    /// The credential file could not be read or written.
    #[error("Credential storage failed: {0}")]
    Store(#[from] StoreError),
}
