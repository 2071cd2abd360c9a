//! Circuit breaker guarding the upstream API.
//!
//! Three states:
//! - **Closed**: calls pass; consecutive failures are counted.
//! - **Open**: calls fail fast with [`LraError::CircuitOpen`] until the
//!   cooldown elapses.
//! - **HalfOpen**: exactly one trial call is in flight. Its outcome closes or
//!   re-opens the circuit.
//!
//! Admission hands out a [`CallPermit`]. The permit reports the outcome of the
//! call; a trial permit dropped without an outcome (the future was cancelled)
//! re-opens the circuit with an already-elapsed cooldown so the next caller
//! can trial again. Outcomes from regular permits only count while Closed;
//! a call admitted before the circuit opened cannot close or re-open it.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{LraError, Result};

/// Default consecutive failures that open the circuit.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default time the circuit stays open.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Current breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open { until: DateTime<Utc> },
    HalfOpen,
}

impl CircuitState {
    /// Short state name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
}

/// Consecutive-failure circuit breaker shared by every request of a client.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                cooldown: config.cooldown,
            },
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
            }),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded since the last success.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Ask to make a call now.
    ///
    /// # Errors
    ///
    /// Returns [`LraError::CircuitOpen`] while the circuit is open or a trial
    /// call is already in flight.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>> {
        self.try_acquire_at(Utc::now())
    }

    /// Ask to make a call at `now`.
    ///
    /// # Errors
    ///
    /// See [`try_acquire`](Self::try_acquire).
    pub fn try_acquire_at(&self, now: DateTime<Utc>) -> Result<CallPermit<'_>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false)),
            CircuitState::Open { until } if now >= until => {
                inner.state = CircuitState::HalfOpen;
                tracing::info!(state = "half_open", "Circuit breaker admitting trial call");
                Ok(CallPermit::new(self, true))
            }
            CircuitState::Open { until } => Err(LraError::CircuitOpen { until }),
            CircuitState::HalfOpen => Err(LraError::CircuitOpen { until: now }),
        }
    }

    /// Record a successful regular call.
    ///
    /// Resets the failure count while Closed. A success that lands while the
    /// circuit is Open or HalfOpen came from a call admitted before the
    /// circuit opened and leaves the state alone; only the trial permit can
    /// close the circuit.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::Open { .. } | CircuitState::HalfOpen => {
                tracing::debug!(
                    state = inner.state.as_str(),
                    "Circuit breaker ignored late success"
                );
            }
        }
    }

    /// Record a failed regular call now.
    pub fn record_failure(&self) {
        self.record_failure_at(Utc::now());
    }

    /// Record a failed regular call at `now`.
    ///
    /// Counts toward the threshold only while Closed. Late failures while
    /// Open or HalfOpen leave the state alone so an in-flight trial decides.
    pub fn record_failure_at(&self, now: DateTime<Utc>) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = inner.failure_count.saturating_add(1);
                if inner.failure_count >= self.config.failure_threshold {
                    let until = self.reopen_at(now);
                    inner.state = CircuitState::Open { until };
                    tracing::warn!(
                        state = "open",
                        failure_count = inner.failure_count,
                        %until,
                        "Circuit breaker opened"
                    );
                } else {
                    tracing::debug!(
                        failure_count = inner.failure_count,
                        state = "closed",
                        "Circuit breaker recorded failure"
                    );
                }
            }
            CircuitState::Open { .. } | CircuitState::HalfOpen => {
                tracing::debug!(
                    state = inner.state.as_str(),
                    "Circuit breaker ignored late failure"
                );
            }
        }
    }

    /// Resolve the half-open trial: success closes, failure re-opens.
    fn resolve_trial(&self, success: bool, now: DateTime<Utc>) {
        let mut inner = self.lock();
        if inner.state != CircuitState::HalfOpen {
            return;
        }
        if success {
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            tracing::info!(from = "half_open", state = "closed", "Circuit breaker closed");
        } else {
            let until = self.reopen_at(now);
            inner.failure_count = inner.failure_count.saturating_add(1);
            inner.state = CircuitState::Open { until };
            tracing::warn!(
                state = "open",
                %until,
                "Circuit breaker trial call failed, re-opening"
            );
        }
    }

    fn abandon_trial(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open { until: Utc::now() };
            tracing::debug!(state = "open", "Circuit breaker trial call abandoned");
        }
    }

    fn reopen_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.config.cooldown)
            .ok()
            .and_then(|cooldown| now.checked_add_signed(cooldown))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission to make one call through the breaker.
#[derive(Debug)]
#[must_use = "a permit must report the call outcome"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl<'a> CallPermit<'a> {
    const fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            resolved: false,
        }
    }

    /// Whether this is the single half-open trial call.
    #[must_use]
    pub const fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.resolved = true;
        if self.trial {
            self.breaker.resolve_trial(true, Utc::now());
        } else {
            self.breaker.record_success();
        }
    }

    pub fn record_failure(mut self) {
        self.resolved = true;
        if self.trial {
            self.breaker.resolve_trial(false, Utc::now());
        } else {
            self.breaker.record_failure();
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.resolved {
            self.breaker.abandon_trial();
        }
    }
}
