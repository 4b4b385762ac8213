//! Per-day wake counter.
//!
//! # File Format
//!
//! ```json
//! { "date": "2025-03-01", "count": 2 }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of wakes issued on one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeCounter {
    /// Local calendar day the count belongs to.
    pub date: NaiveDate,
    /// Wakes issued on `date`.
    pub count: u32,
}

impl WakeCounter {
    /// A zero counter for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self { date, count: 0 }
    }

    /// True when the counter belongs to `today`.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.date == today
    }

    /// Resets to `{today, 0}` if the stored day is not `today`.
    ///
    /// Returns `true` when a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.is_current(today) {
            return false;
        }
        *self = Self::new(today);
        true
    }

    /// Wakes still allowed today under `max_per_day`.
    pub fn remaining(&self, max_per_day: u32) -> u32 {
        max_per_day.saturating_sub(self.count)
    }

    /// True when no wake may be issued under `max_per_day`.
    pub fn is_exhausted(&self, max_per_day: u32) -> bool {
        self.count >= max_per_day
    }
}
