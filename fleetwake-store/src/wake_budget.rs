//! Daily wake budget backed by a JSON counter file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleetwake_core::{Clock, WakeCounter};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// Per-day wake counter with load, reset, increment and persist.
///
/// The day is the local calendar day of the injected clock.
pub struct WakeBudget {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for WakeBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WakeBudget")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl WakeBudget {
    /// Creates a budget for the counter file at `path`.
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    /// Counter file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads today's counter.
    ///
    /// A missing, unreadable or stale file is reset to `{today, 0}` and the
    /// reset is written back before returning.
    ///
    /// # Errors
    ///
    /// IO failures other than a missing file.
    pub async fn load(&self) -> Result<WakeCounter, StoreError> {
        let today = self.clock.now().date_naive();

        let mut counter = match load_json::<WakeCounter>(&self.path).await {
            Ok(counter) => counter,
            Err(e) if e.is_not_found() => {
                debug!(path = %self.path.display(), "No wake counter yet");
                let counter = WakeCounter::new(today);
                save_json(&self.path, &counter).await?;
                return Ok(counter);
            }
            Err(StoreError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt wake counter, resetting");
                let counter = WakeCounter::new(today);
                save_json(&self.path, &counter).await?;
                return Ok(counter);
            }
            Err(e) => return Err(e),
        };

        let stale_date = counter.date;
        if counter.roll_over(today) {
            info!(%stale_date, %today, "New day, wake counter reset");
            save_json(&self.path, &counter).await?;
        }
        Ok(counter)
    }

    /// Records one issued wake and persists the new count.
    ///
    /// # Errors
    ///
    /// IO failures.
    pub async fn increment(&self) -> Result<WakeCounter, StoreError> {
        let mut counter = self.load().await?;
        counter.count = counter.count.saturating_add(1);
        save_json(&self.path, &counter).await?;
        debug!(count = counter.count, date = %counter.date, "Wake recorded");
        Ok(counter)
    }

    /// Wakes still allowed today.
    ///
    /// # Errors
    ///
    /// IO failures.
    pub async fn remaining_today(&self, max_per_day: u32) -> Result<u32, StoreError> {
        Ok(self.load().await?.remaining(max_per_day))
    }
}
