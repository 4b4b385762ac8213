//! Quiet window: a local time-of-day interval in which waking is forbidden.
//!
//! Specified as `"HH:MM-HH:MM"`, half-open `[start, end)`. When `start > end`
//! the window spans midnight. A spec that does not parse yields no window,
//! so malformed configuration never blocks reads.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::Timelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const MINUTES_PER_DAY: u16 = 24 * 60;

static SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2})-(\d{2}):(\d{2})$").unwrap_or_else(|e| {
        panic!("quiet window pattern is a valid regex: {e}");
    })
});

// ============================================================================
// Quiet Window
// ============================================================================

/// A parsed quiet window, as minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietWindow {
    start: u16,
    end: u16,
}

impl QuietWindow {
    /// Creates a window from minute-of-day bounds. Both must be below 1440.
    pub fn new(start: u16, end: u16) -> Option<Self> {
        (start < MINUTES_PER_DAY && end < MINUTES_PER_DAY).then_some(Self { start, end })
    }

    /// Parses `"HH:MM-HH:MM"`. Returns `None` on any malformed input.
    pub fn parse(spec: &str) -> Option<Self> {
        let caps = SPEC_RE.captures(spec.trim())?;
        let field = |i: usize| caps.get(i)?.as_str().parse::<u16>().ok();
        let (h1, m1, h2, m2) = (field(1)?, field(2)?, field(3)?, field(4)?);
        if h1 > 23 || h2 > 23 || m1 > 59 || m2 > 59 {
            return None;
        }
        Self::new(h1 * 60 + m1, h2 * 60 + m2)
    }

    /// Start of the window (inclusive), minutes since midnight.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// End of the window (exclusive), minutes since midnight.
    pub fn end(&self) -> u16 {
        self.end
    }

    /// True when the window crosses midnight.
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// True when `minute_of_day` falls inside the window.
    pub fn contains(&self, minute_of_day: u16) -> bool {
        if self.start <= self.end {
            self.start <= minute_of_day && minute_of_day < self.end
        } else {
            minute_of_day >= self.start || minute_of_day < self.end
        }
    }
}

impl FromStr for QuietWindow {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            CoreError::InvalidConfig(format!("quiet window must be HH:MM-HH:MM, got {s:?}"))
        })
    }
}

impl fmt::Display for QuietWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

// ============================================================================
// Quiet Window Policy
// ============================================================================

/// Decides whether active waking is forbidden at a given local time.
///
/// Total and side-effect free. An absent window is never quiet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuietWindowPolicy {
    window: Option<QuietWindow>,
}

impl QuietWindowPolicy {
    /// Builds the policy from a spec string, failing open on malformed input.
    pub fn from_spec(spec: &str) -> Self {
        Self {
            window: QuietWindow::parse(spec),
        }
    }

    /// Builds the policy from an already parsed window.
    pub fn from_window(window: Option<QuietWindow>) -> Self {
        Self { window }
    }

    /// The configured window, if the spec parsed.
    pub fn window(&self) -> Option<QuietWindow> {
        self.window
    }

    /// True when `now` (local time) is inside the quiet window.
    pub fn is_quiet<T: Timelike>(&self, now: &T) -> bool {
        self.window
            .is_some_and(|w| w.contains(minutes_of_day(now)))
    }

    /// One-shot form: parse `spec` and evaluate it at `now`.
    pub fn is_quiet_at<T: Timelike>(spec: &str, now: &T) -> bool {
        Self::from_spec(spec).is_quiet(now)
    }
}

fn minutes_of_day<T: Timelike>(now: &T) -> u16 {
    // hour <= 23 and minute <= 59, so this always fits.
    u16::try_from(now.hour() * 60 + now.minute()).unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        let w = QuietWindow::parse("00:00-07:30").unwrap();
        assert_eq!(w.start(), 0);
        assert_eq!(w.end(), 450);
        assert!(!w.wraps_midnight());
        assert_eq!(w.to_string(), "00:00-07:30");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(QuietWindow::parse("  22:00-06:00 ").is_some());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for spec in ["", "7:00-8:00", "22:00", "22:00-06:00x", "25:00-06:00", "22:60-06:00", "ab:cd-ef:gh"] {
            assert!(QuietWindow::parse(spec).is_none(), "{spec} should not parse");
        }
    }

    #[test]
    fn test_from_str_reports_error() {
        let err = "nope".parse::<QuietWindow>().unwrap_err();
        assert!(err.to_string().contains("HH:MM-HH:MM"));
    }

    #[test]
    fn test_same_day_window_is_half_open() {
        let policy = QuietWindowPolicy::from_spec("00:00-07:30");
        assert!(policy.is_quiet(&at(0, 0)));
        assert!(policy.is_quiet(&at(7, 29)));
        assert!(!policy.is_quiet(&at(7, 30)));
        assert!(!policy.is_quiet(&at(23, 59)));
    }

    #[test]
    fn test_every_minute_matches_interval_definition() {
        let (start, end) = (13 * 60 + 15, 17 * 60 + 45);
        let policy = QuietWindowPolicy::from_spec("13:15-17:45");
        for minute in 0..MINUTES_PER_DAY {
            let t = at(u32::from(minute / 60), u32::from(minute % 60));
            assert_eq!(policy.is_quiet(&t), start <= minute && minute < end, "minute {minute}");
        }
    }

    #[test]
    fn test_midnight_wrapping_window() {
        let policy = QuietWindowPolicy::from_spec("22:00-06:00");
        assert!(policy.is_quiet(&at(23, 0)));
        assert!(policy.is_quiet(&at(5, 59)));
        assert!(policy.is_quiet(&at(22, 0)));
        assert!(!policy.is_quiet(&at(6, 0)));
        assert!(!policy.is_quiet(&at(12, 0)));
    }

    #[test]
    fn test_empty_window_is_never_quiet() {
        let policy = QuietWindowPolicy::from_spec("08:00-08:00");
        assert!(!policy.is_quiet(&at(8, 0)));
    }

    #[test]
    fn test_malformed_spec_fails_open() {
        assert!(!QuietWindowPolicy::is_quiet_at("garbage", &at(3, 0)));
        assert!(QuietWindowPolicy::from_spec("garbage").window().is_none());
    }
}
