//! Poll configuration and duration parsing for command-line options.

use crate::discovery::DEFAULT_SCAN_DURATION;
use crate::poller::DEFAULT_CYCLE_INTERVAL;
use crate::retry::RetryPolicy;
use std::time::Duration;

/// Timing of discovery and of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between two poll cycles
    pub cycle_interval: Duration,
    /// Length of the startup discovery scan
    pub scan_duration: Duration,
    /// Connect+read attempts per device per cycle
    pub max_retries: u32,
    /// Hard bound on one connect+read attempt
    pub per_attempt_timeout: Duration,
    /// Pause after a failed attempt
    pub retry_delay: Duration,
}

impl PollConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            self.per_attempt_timeout,
            self.retry_delay,
        )
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            scan_duration: DEFAULT_SCAN_DURATION,
            max_retries: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            per_attempt_timeout: RetryPolicy::DEFAULT_PER_ATTEMPT_TIMEOUT,
            retry_delay: RetryPolicy::DEFAULT_DELAY_BETWEEN_ATTEMPTS,
        }
    }
}

/// Parse a duration from a human-readable string.
///
/// Supports the following suffixes:
/// - `s` or no suffix: seconds
/// - `m`: minutes
/// - `h`: hours
/// - `ms`: milliseconds
///
/// # Examples
/// ```
/// use wave_plus_exporter::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("4m").unwrap(), Duration::from_secs(240));
/// assert_eq!(parse_duration("15").unwrap(), Duration::from_secs(15));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be tried before "m" and "s".
    let (number, unit, scale): (&str, &str, fn(u64) -> Option<Duration>) =
        if let Some(num) = src.strip_suffix("ms") {
            (num, "milliseconds", |n: u64| Some(Duration::from_millis(n)))
        } else if let Some(num) = src.strip_suffix('h') {
            (num, "hours", |n: u64| n.checked_mul(3600).map(Duration::from_secs))
        } else if let Some(num) = src.strip_suffix('m') {
            (num, "minutes", |n: u64| n.checked_mul(60).map(Duration::from_secs))
        } else if let Some(num) = src.strip_suffix('s') {
            (num, "seconds", |n: u64| Some(Duration::from_secs(n)))
        } else {
            (src, "duration", |n: u64| Some(Duration::from_secs(n)))
        };

    let value = number
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid {unit}: {number}"))?;
    scale(value).ok_or_else(|| format!("{unit} out of range: {number}"))
}
