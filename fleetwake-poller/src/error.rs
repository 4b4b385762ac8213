//! Poller errors.

use fleetwake_fetch::{ErrorClass, FetchError};
use fleetwake_store::{CredentialError, StoreError};
use thiserror::Error;

/// Fatal poll failures.
///
/// Planned skips (quiet window, wake quota) and the post-wake timeout are
/// outcomes, not errors; see [`crate::PollOutcome`].
#[derive(Debug, Error)]
pub enum PollError {
    /// No usable credential, failed refresh, or the API rejected the token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The partner domain is not registered and remediation failed.
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Any other network or parse failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Wake policy is `never` and the vehicle is unavailable.
    #[error("Vehicle unavailable and wake policy is never: {0}")]
    WakeNotAllowed(String),

    /// A state file could not be read or written.
    #[error("State storage failed: {0}")]
    Store(#[from] StoreError),

    /// The vehicle tag matched nothing on the account.
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),
}

impl PollError {
    /// Maps a classified fetch failure to the fatal error it becomes.
    pub fn from_class(class: ErrorClass, error: &FetchError) -> Self {
        let message = error.to_string();
        match class {
            ErrorClass::Auth => Self::Auth(message),
            ErrorClass::Registration => Self::Registration(message),
            ErrorClass::Unavailable | ErrorClass::Transport => Self::Transport(message),
        }
    }

    /// True for failures that need out-of-band re-authorization.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl From<CredentialError> for PollError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Store(e) => Self::Store(e),
            other => Self::Auth(other.to_string()),
        }
    }
}
