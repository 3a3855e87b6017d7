//! # Exponential Backoff
//!
//! Doubling backoff with a ceiling, used for readiness polling and for
//! transient error retries. Each descriptor key owns its own instance.
//!
//! ## Usage
//!
//! ```rust
//! use managed_service_operator::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_secs(5), Duration::from_secs(30));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(5));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(10));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(20));
//! assert_eq!(backoff.next_backoff(), Duration::from_secs(30));
//! assert!(backoff.at_ceiling());
//! ```

use std::time::Duration;

/// Exponential backoff calculator
///
/// Each call to [`next_backoff`](Self::next_backoff) returns the current delay
/// and doubles it for the next call, capped at `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    current: Duration,
    max: Duration,
    last: Option<Duration>,
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `initial` and never exceeding `max`
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            current: initial,
            max,
            last: None,
            attempts: 0,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        self.last = Some(result);
        self.attempts = self.attempts.saturating_add(1);
        result
    }

    /// Whether the most recent delay handed out was the ceiling
    pub fn at_ceiling(&self) -> bool {
        self.last == Some(self.max)
    }

    /// Number of delays handed out since creation or the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reset the backoff to the initial state
    ///
    /// ```
    /// use managed_service_operator::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60));
    /// backoff.next_backoff();
    /// backoff.next_backoff();
    /// backoff.reset();
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
    /// ```
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.last = None;
        self.attempts = 0;
    }
}
