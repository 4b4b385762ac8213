//! In-memory fakes for the Fleet and token APIs.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use fleetwake_core::{Clock, Credential, FixedClock, TokenGrant, VehicleData, WakeCounter};
use fleetwake_fetch::{
    FetchError, RegistrationStatus, RetryStrategy, TokenApi, VehicleApi, VehicleSummary, WakeAck,
};
use fleetwake_poller::{AvailabilityPoller, PollerSettings, RegistrationGuard, VehicleTag};
use fleetwake_store::{CredentialStore, WakeBudget, load_json, save_json};
use tempfile::TempDir;

// ============================================================================
// Scripted replies
// ============================================================================

/// What the fake answers to one `vehicle_data` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Vehicle online with charge data.
    Data,
    /// 408 "vehicle unavailable".
    Asleep,
    /// Client-side request timeout.
    Timeout,
    /// 412 "must be registered in the current region".
    NotRegistered,
    /// 401.
    Unauthorized,
    /// 500.
    Server,
}

impl Reply {
    fn into_result(self) -> Result<VehicleData, FetchError> {
        match self {
            Self::Data => Ok(VehicleData::from_value(serde_json::json!({
                "response": {
                    "state": "online",
                    "charge_state": {
                        "battery_level": 64,
                        "charging_state": "Charging",
                        "battery_range": 200.0
                    },
                    "vehicle_state": { "odometer": 12345.67 }
                }
            }))
            .unwrap()),
            Self::Asleep => Err(FetchError::Api {
                status: 408,
                message: "vehicle unavailable: vehicle is offline or asleep".to_string(),
            }),
            Self::Timeout => Err(FetchError::Timeout),
            Self::NotRegistered => Err(FetchError::Api {
                status: 412,
                message: "Account must be registered in the current region".to_string(),
            }),
            Self::Unauthorized => Err(FetchError::Api {
                status: 401,
                message: "invalid bearer token".to_string(),
            }),
            Self::Server => Err(FetchError::Api {
                status: 500,
                message: "internal server error".to_string(),
            }),
        }
    }
}

// ============================================================================
// Fake Fleet API
// ============================================================================

/// Scripted [`VehicleApi`] that records every call.
#[derive(Debug)]
pub struct FakeFleet {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    wake_ack: WakeAck,
    register_fails: bool,
    vehicles: Vec<VehicleSummary>,
    list_script: Mutex<VecDeque<Reply>>,
    /// `(token, vehicle_id)` of every data read.
    pub reads: Mutex<Vec<(String, String)>>,
    /// Vehicle ids woken.
    pub wakes: Mutex<Vec<String>>,
    /// Domains registered.
    pub registrations: Mutex<Vec<String>>,
    /// Number of vehicle list calls.
    pub list_calls: Mutex<usize>,
}

impl FakeFleet {
    /// Answers reads with `script`, then `Asleep` forever.
    pub fn new(script: &[Reply]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback: Reply::Asleep,
            wake_ack: WakeAck::Accepted {
                state: Some("asleep".to_string()),
            },
            register_fails: false,
            vehicles: Vec::new(),
            list_script: Mutex::new(VecDeque::new()),
            reads: Mutex::new(Vec::new()),
            wakes: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            list_calls: Mutex::new(0),
        }
    }

    /// Answers wake commands with `ack`.
    pub fn with_wake_ack(mut self, ack: WakeAck) -> Self {
        self.wake_ack = ack;
        self
    }

    /// Makes every registration call fail.
    pub fn with_failing_registration(mut self) -> Self {
        self.register_fails = true;
        self
    }

    /// Vehicle list, preceded by scripted list failures.
    pub fn with_vehicles(mut self, vehicles: Vec<VehicleSummary>, failures: &[Reply]) -> Self {
        self.vehicles = vehicles;
        self.list_script = Mutex::new(failures.iter().copied().collect());
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.lock().unwrap().len()
    }

    pub fn wake_count(&self) -> usize {
        self.wakes.lock().unwrap().len()
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }
}

#[async_trait]
impl VehicleApi for FakeFleet {
    async fn vehicle_data(
        &self,
        token: &str,
        vehicle_id: &str,
    ) -> Result<VehicleData, FetchError> {
        self.reads
            .lock()
            .unwrap()
            .push((token.to_string(), vehicle_id.to_string()));
        let reply = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        reply.into_result()
    }

    async fn wake_up(&self, _token: &str, vehicle_id: &str) -> WakeAck {
        self.wakes.lock().unwrap().push(vehicle_id.to_string());
        self.wake_ack.clone()
    }

    async fn list_vehicles(&self, _token: &str) -> Result<Vec<VehicleSummary>, FetchError> {
        *self.list_calls.lock().unwrap() += 1;
        if let Some(reply) = self.list_script.lock().unwrap().pop_front() {
            reply.into_result()?;
        }
        Ok(self.vehicles.clone())
    }

    async fn register_partner(&self, _token: &str, domain: &str) -> Result<(), FetchError> {
        self.registrations.lock().unwrap().push(domain.to_string());
        if self.register_fails {
            return Err(FetchError::Api {
                status: 503,
                message: "registration service unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn partner_status(
        &self,
        _token: &str,
        _domain: &str,
    ) -> Result<RegistrationStatus, FetchError> {
        Ok(RegistrationStatus {
            registered: !self.register_fails,
            public_key: None,
        })
    }
}

// ============================================================================
// Fake token endpoint
// ============================================================================

/// Counts refresh grants.
#[derive(Debug, Default)]
pub struct FakeTokens {
    /// Refresh tokens presented.
    pub calls: Mutex<Vec<String>>,
}

impl FakeTokens {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenApi for FakeTokens {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, FetchError> {
        self.calls.lock().unwrap().push(refresh_token.to_string());
        Ok(TokenGrant {
            access_token: "fresh-access".to_string(),
            refresh_token: None,
            expires_in: Some(28_800),
        })
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Temp state directory, fixed clock and fakes wired into a poller.
pub struct Harness {
    pub dir: TempDir,
    pub fleet: Arc<FakeFleet>,
    pub tokens: Arc<FakeTokens>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    /// Harness at local time `at` with a valid access token `current-access`.
    pub async fn new(at: &str, fleet: FakeFleet) -> Self {
        let harness = Self {
            dir: tempfile::tempdir().unwrap(),
            fleet: Arc::new(fleet),
            tokens: Arc::new(FakeTokens::default()),
            clock: Arc::new(FixedClock::at(at).unwrap()),
        };
        harness
            .write_credential(&Credential {
                access_token: Some("current-access".to_string()),
                refresh_token: Some("refresh-1".to_string()),
                expires_at: Some(harness.clock.now_utc() + chrono::Duration::hours(1)),
            })
            .await;
        harness
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.dir.path().join("tokens.json")
    }

    pub fn counter_path(&self) -> PathBuf {
        self.dir.path().join("wake_counter.json")
    }

    pub async fn write_credential(&self, credential: &Credential) {
        save_json(&self.tokens_path(), credential).await.unwrap();
    }

    pub async fn remove_credential(&self) {
        tokio::fs::remove_file(self.tokens_path()).await.unwrap();
    }

    pub async fn set_counter(&self, date: &str, count: u32) {
        let counter = WakeCounter {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            count,
        };
        save_json(&self.counter_path(), &counter).await.unwrap();
    }

    pub async fn counter(&self) -> WakeCounter {
        load_json(&self.counter_path()).await.unwrap()
    }

    /// Poller with registration for `domain` (or disabled).
    pub fn poller(&self, settings: PollerSettings, domain: Option<&str>) -> AvailabilityPoller {
        let credentials =
            CredentialStore::new(self.tokens_path(), self.tokens.clone(), self.clock.clone());
        let budget = WakeBudget::new(self.counter_path(), self.clock.clone());
        let registration =
            RegistrationGuard::new(self.fleet.clone(), domain.map(str::to_string));
        AvailabilityPoller::new(
            self.fleet.clone(),
            credentials,
            budget,
            registration,
            self.clock.clone(),
            settings,
        )
    }
}

/// Settings for vehicle 42 with `attempts` undelayed post-wake reads.
pub fn settings(attempts: u32) -> PollerSettings {
    let mut settings = PollerSettings::new(VehicleTag::parse("42").unwrap());
    settings.max_wakes_per_day = 16;
    settings.post_wake = RetryStrategy::fixed(attempts, Duration::ZERO);
    settings
}
