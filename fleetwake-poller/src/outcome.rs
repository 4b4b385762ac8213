//! Poll outcomes and the per-run trace.

use std::fmt;

use chrono::{DateTime, Utc};
use fleetwake_core::{LogRecord, QuietWindow, SkipReason, VehicleSnapshot};
use fleetwake_fetch::{ErrorClass, WakeAck};

use crate::error::PollError;

// ============================================================================
// Phase
// ============================================================================

/// States of the poll state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing done yet.
    Idle,
    /// First data read (and its one registration retry).
    Reading,
    /// A read returned data.
    Available,
    /// A read failed with an unavailable-class error.
    Unavailable,
    /// Checking wake policy, quiet window and budget.
    Deciding,
    /// Wake issued.
    Waking,
    /// Reading on a fixed schedule after the wake.
    PollingAfterWake,
    /// Post-wake attempts exhausted.
    TimedOut,
    /// Outcome decided.
    Terminal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Reading => "reading",
            Self::Available => "available",
            Self::Unavailable => "unavailable",
            Self::Deciding => "deciding",
            Self::Waking => "waking",
            Self::PollingAfterWake => "polling_after_wake",
            Self::TimedOut => "timed_out",
            Self::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of one poller run.
#[derive(Debug)]
pub enum PollOutcome {
    /// The vehicle answered.
    Success {
        /// Normalized reading.
        snapshot: VehicleSnapshot,
        /// Whether a wake preceded the successful read.
        woke: bool,
    },
    /// Unavailable and today's wake budget is spent. Planned skip.
    QuotaBlocked {
        /// Wakes already issued today.
        used: u32,
        /// Daily budget.
        max: u32,
    },
    /// Unavailable inside the quiet window. Planned skip.
    QuietBlocked {
        /// The active window.
        window: QuietWindow,
    },
    /// Still unavailable after every post-wake read.
    Timeout {
        /// Post-wake reads made.
        attempts: u32,
    },
    /// Unrecoverable failure.
    Fatal(PollError),
}

impl PollOutcome {
    /// True for [`PollOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// True for the planned, non-error skips.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::QuotaBlocked { .. } | Self::QuietBlocked { .. })
    }

    /// The snapshot, on success.
    pub fn snapshot(&self) -> Option<&VehicleSnapshot> {
        match self {
            Self::Success { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    /// Log line for this outcome, stamped `ts` unless it carries a snapshot.
    pub fn to_record(&self, ts: DateTime<Utc>) -> LogRecord {
        match self {
            Self::Success { snapshot, .. } => LogRecord::Snapshot(snapshot.clone()),
            Self::QuotaBlocked { used, max } => LogRecord::skipped(
                ts,
                SkipReason::WakeQuota,
                format!("vehicle unavailable, {used}/{max} wakes used today"),
            ),
            Self::QuietBlocked { window } => LogRecord::skipped(
                ts,
                SkipReason::QuietWindow,
                format!("vehicle unavailable during quiet window {window}"),
            ),
            Self::Timeout { .. } | Self::Fatal(_) => LogRecord::failure(ts, self.to_string()),
        }
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { snapshot, woke } => write!(
                f,
                "read vehicle (soc {}, awake via {})",
                snapshot
                    .soc_percent
                    .map_or_else(|| "n/a".to_string(), |s| format!("{s}%")),
                if *woke { "wake" } else { "none" }
            ),
            Self::QuotaBlocked { used, max } => {
                write!(f, "skipped: wake quota reached ({used}/{max})")
            }
            Self::QuietBlocked { window } => write!(f, "skipped: quiet window {window}"),
            Self::Timeout { attempts } => write!(
                f,
                "vehicle unavailable after {attempts} post-wake attempts"
            ),
            Self::Fatal(e) => write!(f, "{e}"),
        }
    }
}

// ============================================================================
// Trace
// ============================================================================

/// Record of a single data read.
#[derive(Debug, Clone)]
pub struct ReadAttempt {
    /// When the read was issued.
    pub ts: DateTime<Utc>,
    /// Phase the read belonged to.
    pub phase: Phase,
    /// Failure class, `None` on success.
    pub class: Option<ErrorClass>,
    /// Failure text, `None` on success.
    pub error: Option<String>,
}

impl ReadAttempt {
    /// True if the read returned data.
    pub fn success(&self) -> bool {
        self.class.is_none()
    }
}

/// Everything a run did, in order.
#[derive(Debug, Default, Clone)]
pub struct PollTrace {
    /// Phases entered.
    pub phases: Vec<Phase>,
    /// Data reads issued.
    pub reads: Vec<ReadAttempt>,
    /// Wakes issued.
    pub wakes: Vec<DateTime<Utc>>,
    /// Answer to the wake command, if one was sent.
    pub wake_ack: Option<WakeAck>,
    /// Resolved vehicle id.
    pub vehicle_id: Option<String>,
}

impl PollTrace {
    /// Enters `phase`.
    pub fn enter(&mut self, phase: Phase) {
        self.phases.push(phase);
    }

    /// Reads made after the wake.
    pub fn post_wake_attempts(&self) -> usize {
        self.reads
            .iter()
            .filter(|r| r.phase == Phase::PollingAfterWake)
            .count()
    }

    /// Timestamps of every read.
    pub fn read_times(&self) -> Vec<DateTime<Utc>> {
        self.reads.iter().map(|r| r.ts).collect()
    }

    /// True if `phase` was entered.
    pub fn visited(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}

/// Outcome of a run plus its trace.
#[derive(Debug)]
pub struct PollReport {
    /// Terminal outcome.
    pub outcome: PollOutcome,
    /// What happened on the way.
    pub trace: PollTrace,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
}

impl PollReport {
    /// Log line for this run.
    pub fn to_record(&self) -> LogRecord {
        self.outcome.to_record(self.finished_at)
    }

    /// Time of the successful read, if any.
    pub fn success_at(&self) -> Option<DateTime<Utc>> {
        self.outcome.snapshot().map(|s| s.ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        "2025-03-01T03:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_quiet_record() {
        let window = QuietWindow::parse("00:00-07:30").unwrap();
        let record = PollOutcome::QuietBlocked { window }.to_record(ts());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["skipped"], "quiet_window");
        assert_eq!(
            json["detail"],
            "vehicle unavailable during quiet window 00:00-07:30"
        );
    }

    #[test]
    fn test_quota_record() {
        let record = PollOutcome::QuotaBlocked { used: 2, max: 2 }.to_record(ts());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["skipped"], "wake_quota");
    }

    #[test]
    fn test_timeout_record() {
        let record = PollOutcome::Timeout { attempts: 7 }.to_record(ts());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["error"], "vehicle unavailable after 7 post-wake attempts");
    }

    #[test]
    fn test_fatal_record() {
        let outcome = PollOutcome::Fatal(PollError::Auth("invalid_grant".to_string()));
        assert!(!outcome.is_success());
        assert!(!outcome.is_skip());
        let json = serde_json::to_value(outcome.to_record(ts())).unwrap();
        assert_eq!(json["error"], "Authentication failed: invalid_grant");
    }

    #[test]
    fn test_trace_counts_post_wake_reads() {
        let mut trace = PollTrace::default();
        for phase in [Phase::Reading, Phase::PollingAfterWake, Phase::PollingAfterWake] {
            trace.reads.push(ReadAttempt {
                ts: ts(),
                phase,
                class: Some(ErrorClass::Unavailable),
                error: Some("asleep".to_string()),
            });
        }
        assert_eq!(trace.post_wake_attempts(), 2);
        assert_eq!(trace.read_times().len(), 3);
        assert!(!trace.reads[0].success());
    }
}
