//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fleetwake_core::{Credential, LogRecord, Region, VehicleSnapshot, WakePolicy};
use fleetwake_fetch::WakeAck;
use fleetwake_poller::{PollOutcome, PollReport};
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one poll run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutput {
    /// `success`, `quota_blocked`, `quiet_blocked`, `timeout` or `fatal`.
    pub outcome: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<VehicleSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    pub reads: usize,
    pub wakes: usize,
    pub post_wake_attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wake_ack: Option<String>,
    #[serde(serialize_with = "serialize_datetime")]
    pub finished_at: DateTime<Utc>,
}

impl PollOutput {
    /// Flattens a report for output.
    pub fn from_report(report: &PollReport) -> Self {
        Self {
            outcome: outcome_kind(&report.outcome),
            message: report.outcome.to_string(),
            snapshot: report.outcome.snapshot().cloned(),
            vehicle_id: report.trace.vehicle_id.clone(),
            reads: report.trace.reads.len(),
            wakes: report.trace.wakes.len(),
            post_wake_attempts: report.trace.post_wake_attempts(),
            wake_ack: report.trace.wake_ack.as_ref().map(describe_ack),
            finished_at: report.finished_at,
        }
    }
}

/// Credential summary. Never contains token values.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub present: bool,
    pub has_refresh_token: bool,
    pub has_access_token: bool,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<i64>,
    pub needs_refresh: bool,
}

impl CredentialStatus {
    /// Summarizes `credential` as seen at `now`.
    pub fn from_credential(credential: Option<&Credential>, now: DateTime<Utc>) -> Self {
        match credential {
            Some(c) => Self {
                present: true,
                has_refresh_token: c.refresh_token().is_some(),
                has_access_token: c.access_token.as_deref().is_some_and(|t| !t.is_empty()),
                expires_at: c.expires_at,
                expires_in_secs: c.expires_at.map(|at| (at - now).num_seconds()),
                needs_refresh: c.needs_refresh(now),
            },
            None => Self {
                present: false,
                has_refresh_token: false,
                has_access_token: false,
                expires_at: None,
                expires_in_secs: None,
                needs_refresh: true,
            },
        }
    }
}

/// Today's wake budget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub date: NaiveDate,
    pub used: u32,
    pub max: u32,
    pub remaining: u32,
}

/// Quiet window state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub active: bool,
}

/// Partner registration lookup result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationOutput {
    /// No partner domain configured.
    pub fn disabled() -> Self {
        Self {
            domain: None,
            registered: None,
            error: None,
        }
    }
}

/// Status command output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    #[serde(serialize_with = "serialize_datetime")]
    pub now: DateTime<Utc>,
    pub region: Region,
    pub wake_policy: WakePolicy,
    pub credential: CredentialStatus,
    pub wake_budget: BudgetStatus,
    pub quiet: QuietStatus,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub last_success: Option<DateTime<Utc>>,
    pub wakes_last_7_days: usize,
    pub polls_last_7_days: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_record: Option<LogRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<RegistrationOutput>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Short machine name of an outcome.
pub(crate) fn outcome_kind(outcome: &PollOutcome) -> &'static str {
    match outcome {
        PollOutcome::Success { .. } => "success",
        PollOutcome::QuotaBlocked { .. } => "quota_blocked",
        PollOutcome::QuietBlocked { .. } => "quiet_blocked",
        PollOutcome::Timeout { .. } => "timeout",
        PollOutcome::Fatal(_) => "fatal",
    }
}

/// One-line description of a wake acknowledgement.
pub(crate) fn describe_ack(ack: &WakeAck) -> String {
    match ack {
        WakeAck::Accepted { state: Some(state) } => format!("accepted ({state})"),
        WakeAck::Accepted { state: None } => "accepted".to_string(),
        WakeAck::Rejected { status, message } => format!("rejected: HTTP {status} {message}"),
        WakeAck::Unreachable { message } => format!("unreachable: {message}"),
    }
}

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
