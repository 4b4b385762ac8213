//! Run history: wake and read timestamps plus the last successful read.
//!
//! # File Format
//!
//! ```json
//! {
//!   "wakes": ["2025-03-01T08:00:02Z"],
//!   "polls": ["2025-03-01T08:00:00Z", "2025-03-01T08:00:12Z"],
//!   "last_success_iso": "2025-03-01T08:00:12Z"
//! }
//! ```

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::persistence::{load_json_or_default, save_json};

/// Entries older than this are dropped on save.
pub const RETENTION_DAYS: i64 = 7;

/// Timestamps of recent runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Every wake issued.
    #[serde(default)]
    pub wakes: Vec<DateTime<Utc>>,
    /// Every data-read attempt.
    #[serde(default)]
    pub polls: Vec<DateTime<Utc>>,
    /// Last read that produced a snapshot.
    #[serde(default)]
    pub last_success_iso: Option<DateTime<Utc>>,
}

impl RunState {
    /// Loads the state file; missing or corrupt files give an empty state.
    pub async fn load(path: &Path) -> Self {
        load_json_or_default(path).await
    }

    /// Prunes old entries and writes the file.
    ///
    /// # Errors
    ///
    /// IO or serialization failures.
    pub async fn save(&mut self, path: &Path, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.prune(now);
        save_json(path, self).await?;
        debug!(
            path = %path.display(),
            wakes = self.wakes.len(),
            polls = self.polls.len(),
            "Run state saved"
        );
        Ok(())
    }

    /// Drops entries older than [`RETENTION_DAYS`] before `now`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(RETENTION_DAYS);
        self.wakes.retain(|ts| *ts >= cutoff);
        self.polls.retain(|ts| *ts >= cutoff);
    }

    /// Records a run's reads, wakes and success time.
    pub fn record(
        &mut self,
        polls: &[DateTime<Utc>],
        wakes: &[DateTime<Utc>],
        success: Option<DateTime<Utc>>,
    ) {
        self.polls.extend_from_slice(polls);
        self.wakes.extend_from_slice(wakes);
        if success.is_some() {
            self.last_success_iso = success;
        }
    }

    /// Wakes issued at or after `since`.
    pub fn wakes_since(&self, since: DateTime<Utc>) -> usize {
        self.wakes.iter().filter(|ts| **ts >= since).count()
    }
}
