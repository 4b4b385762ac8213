//! Partner domain registration.
//!
//! Data calls in a region only succeed once the partner domain is
//! registered there. Registration is attempted once per run up front, and
//! again when a call fails with the "must be registered" signature.

use std::sync::Arc;

use fleetwake_fetch::{FetchError, RegistrationStatus, VehicleApi};
use fleetwake_store::RegistrationConfig;
use tracing::{debug, info, instrument, warn};

use crate::error::PollError;

/// Keeps the partner domain registered in the current region.
pub struct RegistrationGuard {
    api: Arc<dyn VehicleApi>,
    domain: Option<String>,
}

impl std::fmt::Debug for RegistrationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationGuard")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

impl RegistrationGuard {
    /// Guard for `domain`; `None` disables registration.
    pub fn new(api: Arc<dyn VehicleApi>, domain: Option<String>) -> Self {
        Self { api, domain }
    }

    /// Guard from configuration.
    pub fn from_config(api: Arc<dyn VehicleApi>, config: &RegistrationConfig) -> Self {
        let domain = config.effective_domain().map(str::to_string);
        if config.auto_register && domain.is_none() {
            warn!("Auto registration enabled but no partner domain set; registration disabled");
        }
        Self::new(api, domain)
    }

    /// Registered domain, if enabled.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// True when the guard will attempt registration.
    pub fn is_enabled(&self) -> bool {
        self.domain.is_some()
    }

    /// Registers the domain. Re-registration is a no-op on the remote side.
    ///
    /// Does nothing when disabled.
    ///
    /// # Errors
    ///
    /// The registration call's failure.
    #[instrument(skip(self, token), fields(domain = ?self.domain))]
    pub async fn ensure_registered(&self, token: &str) -> Result<(), FetchError> {
        let Some(domain) = self.domain.as_deref() else {
            debug!("Registration disabled");
            return Ok(());
        };
        self.api.register_partner(token, domain).await?;
        debug!("Partner domain registered");
        Ok(())
    }

    /// Start-of-run registration. Failures are logged and swallowed.
    ///
    /// Returns whether registration succeeded (or was not needed).
    pub async fn ensure_proactive(&self, token: &str) -> bool {
        match self.ensure_registered(token).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Partner registration failed, continuing");
                false
            }
        }
    }

    /// Registration after a data call failed because the domain is unregistered.
    ///
    /// # Errors
    ///
    /// [`PollError::Registration`] when the guard is disabled or the call fails.
    pub async fn ensure_reactive(&self, token: &str, cause: &FetchError) -> Result<(), PollError> {
        if !self.is_enabled() {
            return Err(PollError::Registration(format!(
                "{cause} (auto registration disabled)"
            )));
        }
        info!("Vehicle call requires registration, registering partner domain");
        self.ensure_registered(token)
            .await
            .map_err(|e| PollError::Registration(e.to_string()))
    }

    /// Current registration status, `None` when disabled.
    ///
    /// # Errors
    ///
    /// The status call's failure.
    pub async fn status(&self, token: &str) -> Result<Option<RegistrationStatus>, FetchError> {
        match self.domain.as_deref() {
            Some(domain) => Ok(Some(self.api.partner_status(token, domain).await?)),
            None => Ok(None),
        }
    }
}
