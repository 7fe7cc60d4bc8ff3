//! Retry budget for reading a sensor.

use std::time::Duration;

/// How hard to try before giving up on one reading.
///
/// The Wave Plus refreshes its reading roughly every five minutes, so the
/// default budget of 12 × (15 s + 5 s) finishes before the next poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of connect+read attempts, at least one
    pub max_attempts: u32,
    /// Hard bound on a single connect+read attempt
    pub per_attempt_timeout: Duration,
    /// Pause after a failed attempt before the next one
    pub delay_between_attempts: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 12;
    pub const DEFAULT_PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DEFAULT_DELAY_BETWEEN_ATTEMPTS: Duration = Duration::from_secs(5);

    pub fn new(
        max_attempts: u32,
        per_attempt_timeout: Duration,
        delay_between_attempts: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            per_attempt_timeout,
            delay_between_attempts,
        }
    }

    /// Longest a full run of failed attempts can take.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        self.per_attempt_timeout * attempts + self.delay_between_attempts * (attempts - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_ATTEMPTS,
            Self::DEFAULT_PER_ATTEMPT_TIMEOUT,
            Self::DEFAULT_DELAY_BETWEEN_ATTEMPTS,
        )
    }
}
