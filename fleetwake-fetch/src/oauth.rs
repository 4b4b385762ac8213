//! OAuth2 token endpoint client.
//!
//! # Token Endpoint
//!
//! ```text
//! POST {auth_base}/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=refresh_token&refresh_token=...&client_id=...
//! ```
//!
//! The response carries `access_token`, an optional rotated
//! `refresh_token`, and `expires_in` in seconds.

use async_trait::async_trait;
use fleetwake_core::TokenGrant;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::FetchError;
use crate::host::http::{HttpClient, read_json};

/// Public Fleet auth base.
pub const DEFAULT_AUTH_BASE: &str = "https://fleet-auth.prd.vn.cloud.tesla.com/oauth2/v3";

/// Authorization endpoint used for the interactive consent step.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://auth.tesla.com/oauth2/v3/authorize";

/// Scopes always requested.
pub const BASE_SCOPES: &[&str] = &[
    "openid",
    "offline_access",
    "vehicle_device_data",
    "vehicle_cmds",
    "vehicle_charging_cmds",
];

// ============================================================================
// Settings
// ============================================================================

/// OAuth client registration.
#[derive(Clone)]
pub struct OAuthSettings {
    /// Token endpoint base, e.g. [`DEFAULT_AUTH_BASE`].
    pub auth_base: String,
    /// Authorization endpoint for the consent URL.
    pub authorize_url: String,
    /// Registered client id.
    pub client_id: String,
    /// Client secret, if the client is confidential.
    pub client_secret: Option<String>,
    /// Registered redirect URI.
    pub redirect_uri: Option<String>,
    /// Scopes added to [`BASE_SCOPES`].
    pub extra_scopes: Vec<String>,
    /// Fleet API base sent as `audience` on code exchange.
    pub audience: Option<String>,
}

impl OAuthSettings {
    /// Settings for the public endpoints with the given client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            auth_base: DEFAULT_AUTH_BASE.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            extra_scopes: Vec::new(),
            audience: None,
        }
    }

    /// All scopes, base first, without duplicates.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = BASE_SCOPES.iter().map(|s| (*s).to_string()).collect();
        for scope in &self.extra_scopes {
            if !scope.is_empty() && !scopes.contains(scope) {
                scopes.push(scope.clone());
            }
        }
        scopes
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.auth_base.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("auth_base", &self.auth_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("extra_scopes", &self.extra_scopes)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Token API Trait
// ============================================================================

/// Token endpoint operations used by the credential store.
#[async_trait]
pub trait TokenApi: Send + Sync {
    /// Performs a `refresh_token` grant.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, FetchError>;
}

// ============================================================================
// Token Client
// ============================================================================

/// Client for the OAuth2 token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: HttpClient,
    settings: OAuthSettings,
}

impl TokenClient {
    /// Creates a token client.
    pub fn new(http: HttpClient, settings: OAuthSettings) -> Self {
        Self { http, settings }
    }

    /// The client settings.
    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    fn base_form(&self, grant_type: &'static str) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("grant_type", grant_type.to_string()),
            ("client_id", self.settings.client_id.clone()),
        ];
        if let Some(secret) = self.settings.client_secret.as_ref().filter(|s| !s.is_empty()) {
            form.push(("client_secret", secret.clone()));
        }
        if let Some(redirect) = self.settings.redirect_uri.as_ref().filter(|s| !s.is_empty()) {
            form.push(("redirect_uri", redirect.clone()));
        }
        form
    }

    async fn post_grant(&self, form: &[(&'static str, String)]) -> Result<TokenGrant, FetchError> {
        let response = self.http.post_form(&self.settings.token_url(), form).await?;
        let value = read_json(response).await?;
        let grant: TokenGrant = serde_json::from_value(value)
            .map_err(|e| FetchError::InvalidResponse(format!("token response: {e}")))?;
        if grant.access_token.is_empty() {
            return Err(FetchError::InvalidResponse(
                "token response has an empty access_token".to_string(),
            ));
        }
        Ok(grant)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Any transport or grant error.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, FetchError> {
        let mut form = self.base_form("authorization_code");
        form.push(("code", code.to_string()));
        if let Some(audience) = &self.settings.audience {
            form.push(("audience", audience.clone()));
        }
        let grant = self.post_grant(&form).await?;
        info!(has_refresh_token = grant.refresh_token.is_some(), "Authorization code exchanged");
        Ok(grant)
    }

    /// Builds the URL the user opens to grant consent.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidUrl`] if the authorize URL or redirect URI is
    /// missing or malformed.
    pub fn authorize_url(&self, state: &str) -> Result<Url, FetchError> {
        let redirect = self
            .settings
            .redirect_uri
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| FetchError::InvalidUrl("redirect URI is not configured".to_string()))?;

        Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", redirect),
                ("scope", self.settings.scopes().join(" ").as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl TokenApi for TokenClient {
    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, FetchError> {
        debug!("Refreshing access token");
        let mut form = self.base_form("refresh_token");
        form.push(("refresh_token", refresh_token.to_string()));
        let grant = self.post_grant(&form).await?;
        debug!(rotated = grant.refresh_token.is_some(), "Access token refreshed");
        Ok(grant)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings(server: &MockServer) -> OAuthSettings {
        let mut settings = OAuthSettings::new("client-1");
        settings.auth_base = server.url("/oauth2/v3");
        settings.redirect_uri = Some("https://example.com/callback".to_string());
        settings
    }

    #[tokio::test]
    async fn test_refresh_grant() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth2/v3/token")
                .body_includes("grant_type=refresh_token")
                .body_includes("refresh_token=rt-1")
                .body_includes("client_id=client-1");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"access_token":"at-2","refresh_token":"rt-2","expires_in":28800}"#);
        });

        let client = TokenClient::new(HttpClient::new().unwrap(), settings(&server));
        let grant = client.refresh("rt-1").await.unwrap();

        assert_eq!(grant.access_token, "at-2");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt-2"));
        assert_eq!(grant.expires_in, Some(28_800));
        mock.assert();
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/v3/token");
            then.status(401)
                .body(r#"{"error":"login_required","error_description":"refresh token revoked"}"#);
        });

        let client = TokenClient::new(HttpClient::new().unwrap(), settings(&server));
        let err = client.refresh("rt-1").await.unwrap_err();

        assert!(matches!(err, FetchError::Api { status: 401, .. }));
        assert_eq!(err.provider_message(), "login_required");
    }

    #[tokio::test]
    async fn test_refresh_missing_access_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/v3/token");
            then.status(200).body(r#"{"token_type":"Bearer"}"#);
        });

        let client = TokenClient::new(HttpClient::new().unwrap(), settings(&server));
        let err = client.refresh("rt-1").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_audience() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth2/v3/token")
                .body_includes("grant_type=authorization_code")
                .body_includes("code=abc")
                .body_includes("audience=");
            then.status(200)
                .body(r#"{"access_token":"at","refresh_token":"rt","expires_in":3600}"#);
        });

        let mut settings = settings(&server);
        settings.audience = Some("https://fleet-api.prd.eu.vn.cloud.tesla.com".to_string());
        let client = TokenClient::new(HttpClient::new().unwrap(), settings);
        let grant = client.exchange_code("abc").await.unwrap();

        assert_eq!(grant.refresh_token.as_deref(), Some("rt"));
        mock.assert();
    }

    #[test]
    fn test_authorize_url_scopes() {
        let mut settings = OAuthSettings::new("client-1");
        settings.redirect_uri = Some("https://example.com/cb".to_string());
        settings.extra_scopes = vec!["energy_device_data".to_string(), "openid".to_string()];

        let client = TokenClient::new(HttpClient::new().unwrap(), settings);
        let url = client.authorize_url("xyz").unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(pairs["client_id"], "client-1");
        assert_eq!(pairs["state"], "xyz");
        assert_eq!(
            pairs["scope"],
            "openid offline_access vehicle_device_data vehicle_cmds vehicle_charging_cmds energy_device_data"
        );
    }

    #[test]
    fn test_authorize_url_requires_redirect() {
        let client = TokenClient::new(HttpClient::new().unwrap(), OAuthSettings::new("c"));
        assert!(client.authorize_url("s").is_err());
    }
}
