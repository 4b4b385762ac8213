//! Run settings: flags with environment fallbacks.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use clap::builder::BoolishValueParser;
use fleetwake_core::{Region, WakePolicy};
use fleetwake_store::config::{
    DEFAULT_MAX_WAKE_PER_DAY, DEFAULT_POST_WAKE_ATTEMPTS, DEFAULT_POST_WAKE_DELAY_SECS,
    DEFAULT_QUIET_WINDOW,
};
use fleetwake_store::{
    Config, OAuthConfig, PathsConfig, RegistrationConfig, StoreError, WakeConfig, parse_scopes,
};
use tracing::warn;

/// Every knob of a run. Each flag falls back to its environment variable.
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Settings")]
pub struct SettingsArgs {
    /// OAuth client id.
    #[arg(long, env = "TESLA_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[arg(long, env = "TESLA_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// OAuth redirect URI.
    #[arg(long, env = "TESLA_REDIRECT_URI", global = true)]
    pub redirect_uri: Option<String>,

    /// API region: eu, na or ap.
    #[arg(long, env = "TESLA_REGION", default_value = "eu", global = true)]
    pub region: String,

    /// Vehicle id or VIN.
    #[arg(long, env = "TESLA_VEHICLE_TAG", global = true)]
    pub vehicle_tag: Option<String>,

    /// Extra OAuth scopes, space or comma separated.
    #[arg(long, env = "EXTRA_SCOPES", default_value = "", global = true)]
    pub extra_scopes: String,

    /// Wake policy: onfail, never or always.
    #[arg(long, env = "WAKE_POLICY", default_value = "onfail", global = true)]
    pub wake_policy: WakePolicy,

    /// Quiet window, HH:MM-HH:MM local time.
    #[arg(long, env = "QUIET_WINDOW", default_value = DEFAULT_QUIET_WINDOW, global = true)]
    pub quiet_window: String,

    /// Wakes allowed per day.
    #[arg(long, env = "MAX_WAKE_PER_DAY", default_value_t = DEFAULT_MAX_WAKE_PER_DAY, global = true)]
    pub max_wake_per_day: u32,

    /// Append-only JSON-lines log.
    #[arg(long, env = "LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Daily wake counter file.
    #[arg(long, env = "DAILY_WAKE_FILE", global = true)]
    pub daily_wake_file: Option<PathBuf>,

    /// OAuth credential file.
    #[arg(long, env = "TOKENS_PATH", global = true)]
    pub tokens_path: Option<PathBuf>,

    /// Run state file.
    #[arg(long, env = "STATE_PATH", global = true)]
    pub state_path: Option<PathBuf>,

    /// Register the partner domain before reading.
    #[arg(
        long,
        env = "AUTO_PARTNER_REGISTER",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        global = true
    )]
    pub auto_partner_register: bool,

    /// Partner domain to register.
    #[arg(long, env = "TESLA_PARTNER_DOMAIN", global = true)]
    pub partner_domain: Option<String>,

    /// Exit 0 when the run is skipped by the quiet window.
    #[arg(
        long,
        env = "EXIT_ZERO_ON_QUIET",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = ArgAction::Set,
        global = true
    )]
    pub exit_zero_on_quiet: bool,

    /// Reads attempted after a wake.
    #[arg(long, env = "POST_WAKE_ATTEMPTS", default_value_t = DEFAULT_POST_WAKE_ATTEMPTS, global = true)]
    pub post_wake_attempts: u32,

    /// Seconds between post-wake reads.
    #[arg(long, env = "POST_WAKE_DELAY_SECS", default_value_t = DEFAULT_POST_WAKE_DELAY_SECS, global = true)]
    pub post_wake_delay_secs: u64,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub http_timeout_secs: u64,

    /// Overrides the region's Fleet API base URL.
    #[arg(long, env = "FLEET_API_BASE", global = true)]
    pub fleet_api_base: Option<String>,

    /// Overrides the OAuth token endpoint base URL.
    #[arg(long, env = "FLEET_AUTH_BASE", global = true)]
    pub fleet_auth_base: Option<String>,
}

impl SettingsArgs {
    /// Builds and validates the run configuration.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] for values that fail validation.
    pub fn to_config(&self) -> Result<Config, StoreError> {
        let region = self.region.parse::<Region>().unwrap_or_else(|e| {
            warn!(region = %self.region, error = %e, "Unknown region, using eu");
            Region::Eu
        });

        let defaults = PathsConfig::default();
        let config = Config {
            region,
            api_base_override: non_empty(self.fleet_api_base.as_deref()),
            vehicle_tag: non_empty(self.vehicle_tag.as_deref()),
            oauth: OAuthConfig {
                client_id: non_empty(self.client_id.as_deref()),
                client_secret: non_empty(self.client_secret.as_deref()),
                redirect_uri: non_empty(self.redirect_uri.as_deref()),
                extra_scopes: parse_scopes(&self.extra_scopes),
                auth_base: non_empty(self.fleet_auth_base.as_deref()),
            },
            wake: WakeConfig {
                policy: self.wake_policy,
                quiet_window: self.quiet_window.clone(),
                max_per_day: self.max_wake_per_day,
                post_wake_attempts: self.post_wake_attempts,
                post_wake_delay_secs: self.post_wake_delay_secs,
            },
            registration: RegistrationConfig {
                auto_register: self.auto_partner_register,
                partner_domain: non_empty(self.partner_domain.as_deref()),
            },
            paths: PathsConfig {
                log_file: self.log_file.clone().unwrap_or(defaults.log_file),
                wake_counter: self.daily_wake_file.clone().unwrap_or(defaults.wake_counter),
                tokens: self.tokens_path.clone().unwrap_or(defaults.tokens),
                state: self.state_path.clone().unwrap_or(defaults.state),
            },
            http_timeout_secs: self.http_timeout_secs,
            exit_zero_on_quiet: self.exit_zero_on_quiet,
        };

        config.validate()?;
        Ok(config)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: SettingsArgs,
    }

    fn parse(args: &[&str]) -> SettingsArgs {
        let mut argv = vec!["fleetwake"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().settings
    }

    #[test]
    fn test_flags_build_config() {
        let config = parse(&[
            "--region",
            "na",
            "--vehicle-tag",
            "5YJ3",
            "--wake-policy",
            "never",
            "--max-wake-per-day",
            "3",
            "--auto-partner-register",
            "false",
            "--extra-scopes",
            "user_data,energy_device_data",
            "--tokens-path",
            "/tmp/t.json",
        ])
        .to_config()
        .unwrap();

        assert_eq!(config.region, Region::Na);
        assert_eq!(config.vehicle_tag.as_deref(), Some("5YJ3"));
        assert_eq!(config.wake.policy, WakePolicy::Never);
        assert_eq!(config.wake.max_per_day, 3);
        assert!(!config.registration.auto_register);
        assert_eq!(config.oauth.extra_scopes, vec!["user_data", "energy_device_data"]);
        assert_eq!(config.paths.tokens, PathBuf::from("/tmp/t.json"));
    }

    #[test]
    fn test_unknown_region_falls_back_to_eu() {
        let config = parse(&["--region", "mars"]).to_config().unwrap();
        assert_eq!(config.region, Region::Eu);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = parse(&["--partner-domain", "", "--client-secret", " "])
            .to_config()
            .unwrap();
        assert!(config.registration.partner_domain.is_none());
        assert!(config.oauth.client_secret.is_none());
    }

    #[test]
    fn test_invalid_wake_policy_is_rejected() {
        assert!(TestCli::try_parse_from(["fleetwake", "--wake-policy", "sometimes"]).is_err());
    }

    #[test]
    fn test_zero_attempts_is_config_error() {
        let err = parse(&["--post-wake-attempts", "0"]).to_config().unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
