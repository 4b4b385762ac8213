//! OAuth credential types.
//!
//! # File Format
//!
//! ```json
//! {
//!   "access_token": "...",
//!   "refresh_token": "...",
//!   "expires_at": 1735000000000
//! }
//! ```
//!
//! `expires_at` is milliseconds since the Unix epoch and already has
//! [`TOKEN_SAFETY_MARGIN_SECS`] subtracted.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds subtracted from the provider's lifetime when computing `expires_at`.
pub const TOKEN_SAFETY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// Credential
// ============================================================================

/// Persisted OAuth credential.
///
/// Created by the bootstrap flow (or `fleetwake seed`), mutated in place on
/// every refresh, never deleted.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Long-lived token used to obtain new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the access token should be considered expired.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Creates a credential holding only a refresh token.
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: None,
            refresh_token: Some(refresh_token.into()),
            expires_at: None,
        }
    }

    /// Returns the refresh token if one is present and non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns the access token if it is present and not expired at `now`.
    pub fn valid_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        if self.needs_refresh(now) {
            None
        } else {
            self.access_token.as_deref()
        }
    }

    /// True when the access token is missing, has no expiry, or has expired.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let has_token = self.access_token.as_deref().is_some_and(|t| !t.is_empty());
        match self.expires_at {
            Some(expires_at) if has_token => now >= expires_at,
            _ => true,
        }
    }

    /// Applies a token endpoint response.
    ///
    /// The refresh token is only replaced when the provider rotated it.
    pub fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.expires_at = Some(grant.expires_at(now));
        self.access_token = Some(grant.access_token);
        if let Some(rotated) = grant.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(rotated);
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// Token Grant
// ============================================================================

/// Successful response from the OAuth2 token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    /// New access token.
    pub access_token: String,
    /// New refresh token, present only when the provider rotates it.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenGrant {
    /// Absolute expiry for this grant, with the safety margin applied.
    ///
    /// A lifetime too large to represent falls back to
    /// [`DEFAULT_TOKEN_LIFETIME_SECS`].
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let lifetime = self
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        expiry_after(now, lifetime)
            .or_else(|| expiry_after(now, DEFAULT_TOKEN_LIFETIME_SECS))
            .unwrap_or(now)
    }
}

fn expiry_after(now: DateTime<Utc>, lifetime_secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(lifetime_secs.saturating_sub(TOKEN_SAFETY_MARGIN_SECS))
        .and_then(|delta| now.checked_add_signed(delta))
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("rotated", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
