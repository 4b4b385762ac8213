//! CLI command implementations.

pub mod auth;
pub mod config;
pub mod poll;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use fleetwake_core::{Clock, SystemClock};
use fleetwake_fetch::{FleetClient, HttpClient, TokenClient};
use fleetwake_store::{Config, CredentialStore};

/// Clients and stores shared by the commands.
pub struct Runtime {
    /// Effective configuration.
    pub config: Config,
    /// Wall clock.
    pub clock: Arc<dyn Clock>,
    /// Fleet API client.
    pub fleet: Arc<FleetClient>,
    http: HttpClient,
}

impl Runtime {
    /// Builds the HTTP stack for `config`.
    pub fn new(config: Config) -> Result<Self> {
        let http = HttpClient::with_timeout(config.http_timeout())
            .context("building HTTP client")?
            .with_allowed_domains(config.allowed_domains());
        let fleet = Arc::new(FleetClient::new(http.clone(), config.api_base()));
        Ok(Self {
            config,
            clock: Arc::new(SystemClock),
            fleet,
            http,
        })
    }

    /// Token endpoint client. Needs a client id.
    pub fn token_client(&self) -> Result<TokenClient> {
        let settings = self.config.oauth_settings()?;
        Ok(TokenClient::new(self.http.clone(), settings))
    }

    /// Credential store backed by the token endpoint.
    pub fn credentials(&self) -> Result<CredentialStore> {
        Ok(CredentialStore::new(
            &self.config.paths.tokens,
            Arc::new(self.token_client()?),
            self.clock.clone(),
        ))
    }
}
