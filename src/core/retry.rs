//! Retry policy for upstream requests.
//!
//! The policy is a pure value: it classifies failures and computes backoff
//! delays, while the client drives the loop and does the sleeping.
//!
//! Backoff is exponential without jitter: `delay(n) = min(base * 2^n, cap)`.

use std::time::Duration;

use crate::error::{LraError, Result};

/// Default attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base of the exponential backoff.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Default upper bound on a single backoff delay.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    Retryable,
    Fatal,
}

/// Result of one transport attempt, as seen by the retry loop.
#[derive(Debug)]
pub enum AttemptOutcome<T> {
    Success(T),
    RetryableFailure(LraError),
    FatalFailure(LraError),
}

impl<T> AttemptOutcome<T> {
    /// Classify a raw attempt result.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => match RetryPolicy::classify(&err) {
                Retryability::Retryable => Self::RetryableFailure(err),
                Retryability::Fatal => Self::FatalFailure(err),
            },
        }
    }
}

/// What the caller should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the delay, then try again.
    RetryAfter(Duration),
    /// Stop and surface the error.
    GiveUp,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_BACKOFF, DEFAULT_BACKOFF_CAP)
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_backoff: Duration, backoff_cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            backoff_cap,
        }
    }

    /// Attempts per request, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Base of the exponential backoff.
    #[must_use]
    pub const fn base_backoff(&self) -> Duration {
        self.base_backoff
    }

    /// Upper bound on a single delay.
    #[must_use]
    pub const fn backoff_cap(&self) -> Duration {
        self.backoff_cap
    }

    /// Classify an error.
    ///
    /// Connection errors, timeouts, interrupted reads, HTTP 429 and 5xx are
    /// retryable. Everything else, including an open circuit, is fatal.
    #[must_use]
    pub const fn classify(err: &LraError) -> Retryability {
        if err.is_retryable() {
            Retryability::Retryable
        } else {
            Retryability::Fatal
        }
    }

    /// Delay to wait after the `attempt`-th retryable failure (0-based).
    ///
    /// Non-decreasing in `attempt` and never above the cap.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_backoff.checked_mul(factor))
            .map_or(self.backoff_cap, |delay| delay.min(self.backoff_cap))
    }

    /// Decide what to do after `attempts_made` attempts ended in `err`.
    #[must_use]
    pub fn decide(&self, err: &LraError, attempts_made: u32) -> RetryDecision {
        match Self::classify(err) {
            Retryability::Fatal => RetryDecision::GiveUp,
            Retryability::Retryable if attempts_made >= self.max_attempts => RetryDecision::GiveUp,
            Retryability::Retryable => {
                RetryDecision::RetryAfter(self.delay(attempts_made.saturating_sub(1)))
            }
        }
    }

    /// Delays between consecutive attempts when every attempt fails.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts - 1).map(|n| self.delay(n)).collect()
    }
}
