//! The wake-and-poll state machine.
//!
//! ```text
//! Idle -> Reading -> Available                                  -> Terminal
//!                 -> Unavailable -> Deciding -> (quiet | quota)  -> Terminal
//!                                           -> Waking -> PollingAfterWake
//!                                                     -> Available | TimedOut -> Terminal
//! ```
//!
//! Any failure that is neither "unavailable" nor a first registration error
//! ends the run from whatever state it occurs in.

use std::sync::Arc;

use fleetwake_core::{Clock, QuietWindowPolicy, Region, VehicleData, VehicleSnapshot, WakePolicy};
use fleetwake_fetch::{Classifier, ErrorClass, FetchError, RetryStrategy, VehicleApi};
use fleetwake_store::{Config, CredentialStore, StoreError, WakeBudget};
use tracing::{debug, info, instrument, warn};

use crate::error::PollError;
use crate::outcome::{Phase, PollOutcome, PollReport, PollTrace, ReadAttempt};
use crate::registration::RegistrationGuard;
use crate::vehicle::{VehicleResolver, VehicleTag};

// ============================================================================
// Settings
// ============================================================================

/// Decision inputs for one run.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Vehicle to read.
    pub vehicle: VehicleTag,
    /// Region recorded in snapshots.
    pub region: Region,
    /// Whether waking is permitted.
    pub wake_policy: WakePolicy,
    /// Daily wake budget.
    pub max_wakes_per_day: u32,
    /// Quiet window.
    pub quiet: QuietWindowPolicy,
    /// Post-wake read schedule.
    pub post_wake: RetryStrategy,
    /// Failure classification table.
    pub classifier: Classifier,
}

impl PollerSettings {
    /// Settings with defaults for everything but the vehicle.
    pub fn new(vehicle: VehicleTag) -> Self {
        Self {
            vehicle,
            region: Region::default(),
            wake_policy: WakePolicy::default(),
            max_wakes_per_day: fleetwake_store::config::DEFAULT_MAX_WAKE_PER_DAY,
            quiet: QuietWindowPolicy::default(),
            post_wake: RetryStrategy::default(),
            classifier: Classifier::default(),
        }
    }

    /// Settings from the run configuration.
    ///
    /// # Errors
    ///
    /// [`StoreError::Config`] when no vehicle tag is configured.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let tag = config
            .vehicle_tag
            .as_deref()
            .ok_or_else(|| StoreError::Config("TESLA_VEHICLE_TAG is not set".to_string()))?;
        let vehicle =
            VehicleTag::parse(tag).map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self {
            vehicle,
            region: config.region,
            wake_policy: config.wake.policy,
            max_wakes_per_day: config.wake.max_per_day,
            quiet: config.quiet_policy(),
            post_wake: config.post_wake_retry(),
            classifier: Classifier::default(),
        })
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Runs one wake-and-poll cycle.
pub struct AvailabilityPoller {
    api: Arc<dyn VehicleApi>,
    credentials: CredentialStore,
    budget: WakeBudget,
    registration: RegistrationGuard,
    clock: Arc<dyn Clock>,
    settings: PollerSettings,
}

impl std::fmt::Debug for AvailabilityPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityPoller")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Failed read with its class.
type ReadError = (ErrorClass, FetchError);

impl AvailabilityPoller {
    /// Creates a poller from its collaborators.
    pub fn new(
        api: Arc<dyn VehicleApi>,
        credentials: CredentialStore,
        budget: WakeBudget,
        registration: RegistrationGuard,
        clock: Arc<dyn Clock>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            api,
            credentials,
            budget,
            registration,
            clock,
            settings,
        }
    }

    /// Decision inputs.
    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Runs the state machine to a terminal outcome.
    #[instrument(skip(self), fields(vehicle = %self.settings.vehicle))]
    pub async fn run(&self) -> PollReport {
        let mut trace = PollTrace::default();
        trace.enter(Phase::Idle);

        let outcome = match self.drive(&mut trace).await {
            Ok(outcome) => outcome,
            Err(e) => PollOutcome::Fatal(e),
        };

        trace.enter(Phase::Terminal);
        info!(outcome = %outcome, reads = trace.reads.len(), wakes = trace.wakes.len(), "Poll finished");

        PollReport {
            outcome,
            trace,
            finished_at: self.clock.now_utc(),
        }
    }

    async fn drive(&self, trace: &mut PollTrace) -> Result<PollOutcome, PollError> {
        // Roll the counter over before anything else can look at it.
        let counter = self.budget.load().await?;
        debug!(count = counter.count, date = %counter.date, "Wake budget loaded");

        let token = self.credentials.get_valid_access_token().await?;
        self.registration.ensure_proactive(&token).await;

        let vehicle_id = self.resolve_vehicle(&token).await?;
        trace.vehicle_id = Some(vehicle_id.clone());

        // Reading
        trace.enter(Phase::Reading);
        let mut result = self.read(&token, &vehicle_id, Phase::Reading, trace).await;
        if let Err((ErrorClass::Registration, cause)) = &result {
            self.registration.ensure_reactive(&token, cause).await?;
            result = self.read(&token, &vehicle_id, Phase::Reading, trace).await;
            if let Err((ErrorClass::Registration, cause)) = &result {
                return Err(PollError::Registration(cause.to_string()));
            }
        }

        let cause = match result {
            Ok(data) => {
                trace.enter(Phase::Available);
                return Ok(self.success(&data, false));
            }
            Err((ErrorClass::Unavailable, cause)) => cause,
            Err((class, cause)) => return Err(PollError::from_class(class, &cause)),
        };
        trace.enter(Phase::Unavailable);
        info!(error = %cause, "Vehicle unavailable");

        // Deciding
        trace.enter(Phase::Deciding);
        if !self.settings.wake_policy.allows_wake() {
            return Err(PollError::WakeNotAllowed(cause.to_string()));
        }
        let now = self.clock.now();
        if let Some(window) = self
            .settings
            .quiet
            .window()
            .filter(|_| self.settings.quiet.is_quiet(&now))
        {
            warn!(%window, "Inside quiet window, not waking");
            return Ok(PollOutcome::QuietBlocked { window });
        }
        let counter = self.budget.load().await?;
        let max = self.settings.max_wakes_per_day;
        if counter.is_exhausted(max) {
            warn!(used = counter.count, max, "Wake quota reached, not waking");
            return Ok(PollOutcome::QuotaBlocked {
                used: counter.count,
                max,
            });
        }

        // Waking
        trace.enter(Phase::Waking);
        let ack = self.api.wake_up(&token, &vehicle_id).await;
        if ack.is_warning() {
            warn!(ack = ?ack, "Wake not acknowledged, polling anyway");
        }
        trace.wakes.push(self.clock.now_utc());
        trace.wake_ack = Some(ack);
        let counter = self.budget.increment().await?;
        info!(used = counter.count, max, "Wake issued");

        // PollingAfterWake
        trace.enter(Phase::PollingAfterWake);
        let schedule = &self.settings.post_wake;
        for attempt in schedule.attempts() {
            let delay = schedule.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(attempt, max_attempts = schedule.max_attempts, "Post-wake read");

            match self
                .read(&token, &vehicle_id, Phase::PollingAfterWake, trace)
                .await
            {
                Ok(data) => {
                    trace.enter(Phase::Available);
                    return Ok(self.success(&data, true));
                }
                Err((ErrorClass::Unavailable, cause)) => {
                    debug!(attempt, error = %cause, "Still unavailable");
                }
                Err((class, cause)) => return Err(PollError::from_class(class, &cause)),
            }
        }

        trace.enter(Phase::TimedOut);
        Ok(PollOutcome::Timeout {
            attempts: schedule.max_attempts,
        })
    }

    async fn resolve_vehicle(&self, token: &str) -> Result<String, PollError> {
        let resolver = VehicleResolver::new(self.settings.vehicle.clone());
        if let Some(id) = resolver.direct_id() {
            return Ok(id.to_string());
        }

        let vehicles = match self.api.list_vehicles(token).await {
            Ok(vehicles) => vehicles,
            Err(e) => match self.settings.classifier.classify(&e) {
                ErrorClass::Registration => {
                    self.registration.ensure_reactive(token, &e).await?;
                    self.api.list_vehicles(token).await.map_err(|e| {
                        let class = self.settings.classifier.classify(&e);
                        PollError::from_class(class, &e)
                    })?
                }
                class => return Err(PollError::from_class(class, &e)),
            },
        };

        let id = resolver.pick(&vehicles)?;
        debug!(vehicle_id = %id, "Resolved vehicle");
        Ok(id)
    }

    async fn read(
        &self,
        token: &str,
        vehicle_id: &str,
        phase: Phase,
        trace: &mut PollTrace,
    ) -> Result<VehicleData, ReadError> {
        let ts = self.clock.now_utc();
        match self.api.vehicle_data(token, vehicle_id).await {
            Ok(data) => {
                trace.reads.push(ReadAttempt {
                    ts,
                    phase,
                    class: None,
                    error: None,
                });
                Ok(data)
            }
            Err(e) => {
                let class = self.settings.classifier.classify(&e);
                debug!(%phase, %class, error = %e, "Read failed");
                trace.reads.push(ReadAttempt {
                    ts,
                    phase,
                    class: Some(class),
                    error: Some(e.to_string()),
                });
                Err((class, e))
            }
        }
    }

    fn success(&self, data: &VehicleData, woke: bool) -> PollOutcome {
        let snapshot =
            VehicleSnapshot::from_data(data, self.clock.now_utc(), woke, self.settings.region);
        PollOutcome::Success { snapshot, woke }
    }
}
