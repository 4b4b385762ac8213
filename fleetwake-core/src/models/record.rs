//! Lines of the append-only log.
//!
//! Every terminal outcome of a run produces exactly one line:
//!
//! ```json
//! {"ts":"...","soc_percent":78.0,"is_charging":false,...,"awake_via":"none"}
//! {"ts":"...","skipped":"quiet_window","detail":"vehicle unavailable during 00:00-07:30"}
//! {"ts":"...","error":"vehicle unavailable after 7 post-wake attempts"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::VehicleSnapshot;

/// Why a run ended without reading and without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Vehicle unavailable inside the quiet window.
    QuietWindow,
    /// Daily wake budget exhausted.
    WakeQuota,
}

/// A planned no-op run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// When the run ended.
    pub ts: DateTime<Utc>,
    /// Skip reason.
    pub skipped: SkipReason,
    /// Human-readable detail.
    pub detail: String,
}

/// A failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// When the run ended.
    pub ts: DateTime<Utc>,
    /// Error message.
    pub error: String,
}

/// One line of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    /// Run failed.
    Failure(FailureRecord),
    /// Run skipped by policy.
    Skipped(SkipRecord),
    /// Run read the vehicle.
    Snapshot(VehicleSnapshot),
}

impl LogRecord {
    /// Builds a failure record.
    pub fn failure(ts: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self::Failure(FailureRecord {
            ts,
            error: error.into(),
        })
    }

    /// Builds a skip record.
    pub fn skipped(ts: DateTime<Utc>, reason: SkipReason, detail: impl Into<String>) -> Self {
        Self::Skipped(SkipRecord {
            ts,
            skipped: reason,
            detail: detail.into(),
        })
    }

    /// Timestamp of the record.
    pub fn ts(&self) -> DateTime<Utc> {
        match self {
            Self::Failure(r) => r.ts,
            Self::Skipped(r) => r.ts,
            Self::Snapshot(s) => s.ts,
        }
    }
}
