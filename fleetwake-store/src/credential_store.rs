//! Persisted OAuth credential with silent refresh.
//!
//! # File Format
//!
//! ```json
//! {
//!   "access_token": "eyJ...",
//!   "refresh_token": "NA_...",
//!   "expires_at": 1740830400000
//! }
//! ```
//!
//! `expires_at` is epoch milliseconds and already includes the safety margin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleetwake_core::{Clock, Credential, TokenGrant};
use fleetwake_fetch::TokenApi;
use tracing::{debug, info, instrument};

use crate::error::{CredentialError, StoreError};
use crate::persistence::{load_json_opt, save_json};

/// Loads, refreshes and persists the OAuth credential.
pub struct CredentialStore {
    path: PathBuf,
    tokens: Arc<dyn TokenApi>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Creates a store for the credential file at `path`.
    pub fn new(path: impl Into<PathBuf>, tokens: Arc<dyn TokenApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            tokens,
            clock,
        }
    }

    /// Credential file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the credential file, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// IO or parse failures.
    pub async fn load(&self) -> Result<Option<Credential>, StoreError> {
        load_json_opt(&self.path).await
    }

    /// Writes the credential file atomically.
    ///
    /// # Errors
    ///
    /// IO or serialization failures.
    pub async fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        save_json(&self.path, credential).await
    }

    /// Replaces the credential with one holding only `refresh_token`.
    ///
    /// The next run refreshes before its first read.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] for an empty token, or write failures.
    pub async fn seed(&self, refresh_token: &str) -> Result<Credential, StoreError> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(StoreError::Config("refresh token is empty".to_string()));
        }
        let credential = Credential::from_refresh_token(refresh_token);
        self.save(&credential).await?;
        info!(path = %self.path.display(), "Seeded credential");
        Ok(credential)
    }

    /// Merges a grant into the stored credential and persists it.
    ///
    /// # Errors
    ///
    /// IO or parse failures.
    pub async fn store_grant(&self, grant: TokenGrant) -> Result<Credential, StoreError> {
        let mut credential = self.load().await?.unwrap_or_default();
        credential.apply_grant(grant, self.clock.now_utc());
        self.save(&credential).await?;
        Ok(credential)
    }

    /// Returns an unexpired access token, refreshing once if needed.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::Missing`] when there is no refresh token
    /// - [`CredentialError::Refresh`] when the grant fails (not retried)
    /// - [`CredentialError::Store`] on file errors
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn get_valid_access_token(&self) -> Result<String, CredentialError> {
        let missing = || CredentialError::Missing(self.path.display().to_string());

        let mut credential = self.load().await?.ok_or_else(missing)?;
        let refresh_token = credential.refresh_token().ok_or_else(missing)?.to_string();

        let now = self.clock.now_utc();
        if let Some(token) = credential.valid_access_token(now) {
            debug!("Access token still valid");
            return Ok(token.to_string());
        }

        debug!("Access token missing or expired, refreshing");
        let grant = self.tokens.refresh(&refresh_token).await?;
        let access_token = grant.access_token.clone();
        let rotated = grant
            .refresh_token
            .as_deref()
            .is_some_and(|t| !t.is_empty() && t != refresh_token);

        credential.apply_grant(grant, self.clock.now_utc());
        self.save(&credential).await?;

        info!(rotated, expires_at = ?credential.expires_at, "Refreshed access token");
        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use fleetwake_core::FixedClock;
    use fleetwake_fetch::FetchError;
    use std::sync::Mutex;

    /// Records refresh calls and replies with a fixed grant.
    struct FakeTokens {
        calls: Mutex<Vec<String>>,
        rotate_to: Option<String>,
        fail: bool,
    }

    impl FakeTokens {
        fn new(rotate_to: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                rotate_to: rotate_to.map(String::from),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                rotate_to: None,
                fail: true,
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenApi for FakeTokens {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, FetchError> {
            self.calls.lock().unwrap().push(refresh_token.to_string());
            if self.fail {
                return Err(FetchError::AuthenticationFailed("invalid_grant".to_string()));
            }
            Ok(TokenGrant {
                access_token: "fresh-access".to_string(),
                refresh_token: self.rotate_to.clone(),
                expires_in: Some(28_800),
            })
        }
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::at("2025-03-01T12:00:00+00:00").unwrap())
    }

    fn store(dir: &Path, tokens: Arc<FakeTokens>, clock: Arc<FixedClock>) -> CredentialStore {
        CredentialStore::new(dir.join("tokens.json"), tokens, clock)
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FakeTokens::new(None);
        let clock = clock();
        let store = store(dir.path(), tokens.clone(), clock.clone());

        store
            .save(&Credential {
                access_token: Some("stale".to_string()),
                refresh_token: Some("refresh-1".to_string()),
                expires_at: Some(clock.now_utc() - Duration::minutes(5)),
            })
            .await
            .unwrap();

        let token = store.get_valid_access_token().await.unwrap();
        assert_eq!(token, "fresh-access");
        assert_eq!(tokens.calls(), vec!["refresh-1".to_string()]);

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.access_token.as_deref(), Some("fresh-access"));
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(
            saved.expires_at,
            Some(clock.now_utc() + Duration::seconds(28_800 - 60))
        );

        // Now valid: no second refresh.
        store.get_valid_access_token().await.unwrap();
        assert_eq!(tokens.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_valid_token_skips_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FakeTokens::new(None);
        let clock = clock();
        let store = store(dir.path(), tokens.clone(), clock.clone());

        store
            .save(&Credential {
                access_token: Some("current".to_string()),
                refresh_token: Some("refresh-1".to_string()),
                expires_at: Some(clock.now_utc() + Duration::hours(1)),
            })
            .await
            .unwrap();

        assert_eq!(store.get_valid_access_token().await.unwrap(), "current");
        assert!(tokens.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FakeTokens::new(Some("refresh-2"));
        let store = store(dir.path(), tokens.clone(), clock());

        store.seed("refresh-1").await.unwrap();
        store.get_valid_access_token().await.unwrap();

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-2"));
    }

    #[tokio::test]
    async fn test_missing_file_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FakeTokens::new(None);
        let store = store(dir.path(), tokens.clone(), clock());

        let err = store.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Missing(_)));
        assert!(tokens.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FakeTokens::new(None);
        let store = store(dir.path(), tokens.clone(), clock());

        store
            .save(&Credential {
                access_token: Some("orphan".to_string()),
                refresh_token: None,
                expires_at: None,
            })
            .await
            .unwrap();

        let err = store.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Missing(_)));
    }

    #[tokio::test]
    async fn test_refresh_failure_propagates_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = FakeTokens::failing();
        let store = store(dir.path(), tokens.clone(), clock());

        store.seed("refresh-1").await.unwrap();
        let err = store.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Refresh(_)));
        assert_eq!(tokens.calls().len(), 1);

        // The stored credential is untouched.
        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved, Credential::from_refresh_token("refresh-1"));
    }

    #[tokio::test]
    async fn test_store_grant_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let clock = clock();
        let store = store(dir.path(), FakeTokens::new(None), clock.clone());

        let credential = store
            .store_grant(TokenGrant {
                access_token: "a".to_string(),
                refresh_token: Some("r".to_string()),
                expires_in: None,
            })
            .await
            .unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("r"));
        assert_eq!(
            credential.expires_at,
            Some(clock.now_utc() + Duration::seconds(3600 - 60))
        );
        assert!(store.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seed_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), FakeTokens::new(None), clock());
        assert!(store.seed("   ").await.is_err());
    }
}
