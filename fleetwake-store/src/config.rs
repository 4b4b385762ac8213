//! Run configuration.
//!
//! Built once by the CLI (flags with environment fallbacks) and handed to
//! each component. Nothing below reads the process environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleetwake_core::{QuietWindowPolicy, Region, WakePolicy};
use fleetwake_fetch::host::http::DEFAULT_TIMEOUT_SECS;
use fleetwake_fetch::oauth::DEFAULT_AUTH_BASE;
use fleetwake_fetch::{OAuthSettings, RetryStrategy};
use serde::Serialize;
use tracing::warn;
use url::Url;

use crate::error::StoreError;
use crate::persistence::DEFAULT_STATE_DIR;

/// Default quiet window.
pub const DEFAULT_QUIET_WINDOW: &str = "00:00-07:30";

/// Default daily wake budget.
pub const DEFAULT_MAX_WAKE_PER_DAY: u32 = 16;

/// Default number of reads after a wake.
pub const DEFAULT_POST_WAKE_ATTEMPTS: u32 = 7;

/// Default delay between reads after a wake.
pub const DEFAULT_POST_WAKE_DELAY_SECS: u64 = 10;

/// Immutable run configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Fleet API region.
    pub region: Region,
    /// Overrides the region's API base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_override: Option<String>,
    /// Numeric vehicle id or VIN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_tag: Option<String>,
    /// OAuth client settings.
    pub oauth: OAuthConfig,
    /// Wake decision settings.
    pub wake: WakeConfig,
    /// Partner registration settings.
    pub registration: RegistrationConfig,
    /// State and log file locations.
    pub paths: PathsConfig,
    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,
    /// Whether a quiet-window skip exits with status 0.
    pub exit_zero_on_quiet: bool,
}

/// OAuth client settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OAuthConfig {
    /// Registered client id.
    pub client_id: Option<String>,
    /// Client secret. Never serialized.
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// Registered redirect URI.
    pub redirect_uri: Option<String>,
    /// Scopes requested in addition to the base set.
    pub extra_scopes: Vec<String>,
    /// Overrides the token endpoint base.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_base: Option<String>,
}

/// Wake decision settings.
#[derive(Debug, Clone, Serialize)]
pub struct WakeConfig {
    /// Whether waking is permitted.
    pub policy: WakePolicy,
    /// Quiet window spec, `HH:MM-HH:MM` local time.
    pub quiet_window: String,
    /// Wakes allowed per local calendar day.
    pub max_per_day: u32,
    /// Reads attempted after a wake.
    pub post_wake_attempts: u32,
    /// Delay before each post-wake read, in seconds.
    pub post_wake_delay_secs: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            policy: WakePolicy::default(),
            quiet_window: DEFAULT_QUIET_WINDOW.to_string(),
            max_per_day: DEFAULT_MAX_WAKE_PER_DAY,
            post_wake_attempts: DEFAULT_POST_WAKE_ATTEMPTS,
            post_wake_delay_secs: DEFAULT_POST_WAKE_DELAY_SECS,
        }
    }
}

/// Partner registration settings.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationConfig {
    /// Register the partner domain before reading.
    pub auto_register: bool,
    /// Partner domain to register.
    pub partner_domain: Option<String>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            auto_register: true,
            partner_domain: None,
        }
    }
}

impl RegistrationConfig {
    /// The domain to register, if registration is enabled and a domain is set.
    pub fn effective_domain(&self) -> Option<&str> {
        if !self.auto_register {
            return None;
        }
        self.partner_domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// State and log file locations.
#[derive(Debug, Clone, Serialize)]
pub struct PathsConfig {
    /// Append-only JSON-lines log.
    pub log_file: PathBuf,
    /// Daily wake counter.
    pub wake_counter: PathBuf,
    /// OAuth credential.
    pub tokens: PathBuf,
    /// Run state.
    pub state: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let dir = Path::new(DEFAULT_STATE_DIR);
        Self {
            log_file: dir.join("tesla_soc.jsonl"),
            wake_counter: dir.join("wake_counter.json"),
            tokens: dir.join("tokens.json"),
            state: dir.join("state.json"),
        }
    }
}

impl PathsConfig {
    /// Lock file guarding a run, next to the run-state file.
    pub fn lock_file(&self) -> PathBuf {
        self.state.with_extension("lock")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: Region::default(),
            api_base_override: None,
            vehicle_tag: None,
            oauth: OAuthConfig::default(),
            wake: WakeConfig::default(),
            registration: RegistrationConfig::default(),
            paths: PathsConfig::default(),
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            exit_zero_on_quiet: true,
        }
    }
}

impl Config {
    /// Checks values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.wake.post_wake_attempts == 0 {
            return Err(StoreError::Config(
                "POST_WAKE_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(StoreError::Config(
                "HTTP_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        for base in [self.api_base(), self.auth_base()] {
            Url::parse(base)
                .map_err(|e| StoreError::Config(format!("invalid base URL {base:?}: {e}")))?;
        }
        Ok(())
    }

    /// Fleet API base URL.
    pub fn api_base(&self) -> &str {
        self.api_base_override
            .as_deref()
            .unwrap_or_else(|| self.region.api_base())
    }

    /// Token endpoint base URL.
    pub fn auth_base(&self) -> &str {
        self.oauth.auth_base.as_deref().unwrap_or(DEFAULT_AUTH_BASE)
    }

    /// Hosts the HTTP client may talk to.
    pub fn allowed_domains(&self) -> Vec<String> {
        let mut domains = Vec::new();
        for base in [self.api_base(), self.auth_base()] {
            if let Some(host) = Url::parse(base).ok().and_then(|u| u.host_str().map(String::from))
            {
                if !domains.contains(&host) {
                    domains.push(host);
                }
            }
        }
        domains
    }

    /// HTTP request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// OAuth client settings for the token endpoint.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] when no client id is configured.
    pub fn oauth_settings(&self) -> Result<OAuthSettings, StoreError> {
        let client_id = self
            .oauth
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::Config("TESLA_CLIENT_ID is not set".to_string()))?;

        let mut settings = OAuthSettings::new(client_id);
        settings.auth_base = self.auth_base().to_string();
        settings.client_secret = self.oauth.client_secret.clone().filter(|s| !s.is_empty());
        settings.redirect_uri = self.oauth.redirect_uri.clone().filter(|s| !s.is_empty());
        settings.extra_scopes = self.oauth.extra_scopes.clone();
        settings.audience = Some(self.api_base().to_string());
        Ok(settings)
    }

    /// Read schedule after a wake.
    pub fn post_wake_retry(&self) -> RetryStrategy {
        RetryStrategy::fixed(
            self.wake.post_wake_attempts,
            Duration::from_secs(self.wake.post_wake_delay_secs),
        )
    }

    /// Quiet-window policy. A malformed spec is logged and disables the window.
    pub fn quiet_policy(&self) -> QuietWindowPolicy {
        let spec = self.wake.quiet_window.trim();
        let policy = QuietWindowPolicy::from_spec(spec);
        if policy.window().is_none() && !spec.is_empty() {
            warn!(spec, "Malformed quiet window, quiet hours disabled");
        }
        policy
    }
}

/// Splits a scope list on whitespace and commas.
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
