//! Wall-clock abstraction.
//!
//! Components that care about "today" or "now" (the wake counter, the
//! quiet window, token expiry) take a [`Clock`] instead of calling
//! `Local::now()` directly, so tests can pin the time and the offset.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Source of the current local time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time with the local UTC offset attached.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current time in UTC.
    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// The system clock in the process's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A manually controlled clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    /// Creates a clock pinned at `now`.
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Parses an RFC 3339 timestamp, e.g. `2025-03-01T23:00:00+01:00`.
    ///
    /// # Errors
    ///
    /// Returns the chrono parse error if `s` is not RFC 3339.
    pub fn at(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(Self::new)
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.lock() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.lock();
        *guard += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
        // A poisoned lock still holds a valid timestamp.
        self.now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.lock()
    }
}
