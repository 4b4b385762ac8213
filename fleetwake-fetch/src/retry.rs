//! Retry schedules.

use std::time::Duration;

/// A bounded schedule of attempts a fixed delay apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryStrategy {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Delay before each attempt.
    pub delay: Duration,
}

impl RetryStrategy {
    /// Creates a fixed-delay strategy.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Delay before a given attempt number (1-based).
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.delay
    }

    /// Attempt numbers, `1..=max_attempts`.
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts
    }
}

impl Default for RetryStrategy {
    /// Seven attempts ten seconds apart: about seventy seconds for a car to wake.
    fn default() -> Self {
        Self::fixed(7, Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let strategy = RetryStrategy::default();

        assert_eq!(strategy.max_attempts, 7);
        assert_eq!(strategy.delay_for_attempt(1), Duration::from_secs(10));
        assert_eq!(strategy.delay_for_attempt(7), Duration::from_secs(10));
        assert_eq!(strategy.attempts().count(), 7);
    }

    #[test]
    fn test_zero_attempts_is_empty() {
        let strategy = RetryStrategy::fixed(0, Duration::ZERO);
        assert_eq!(strategy.attempts().count(), 0);
    }
}
