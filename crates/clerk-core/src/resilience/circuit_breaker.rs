//! Circuit breaker for the AI backend.
//!
//! Counts failures inside a sliding window. Once the threshold is reached the
//! circuit opens and every call is rejected until the cooldown elapses; then a
//! single probe is let through. A successful probe closes the circuit, a
//! failed one re-opens it.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker settings. A `failure_threshold` of 0 disables the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures within the window that trip the circuit.
    pub failure_threshold: u32,
    /// Window in which failures are counted, in milliseconds.
    pub failure_window_ms: u64,
    /// How long a tripped circuit stays open, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window_ms: 60_000,
            cooldown_ms: 30_000,
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected.
    Open,
    /// One probe call is in flight.
    HalfOpen,
}

#[derive(Debug, Clone)]
enum State {
    Closed { failures: Vec<Instant> },
    Open { tripped_at: Instant },
    HalfOpen,
}

impl Default for State {
    fn default() -> Self {
        Self::Closed {
            failures: Vec::new(),
        }
    }
}

/// Thread-safe circuit breaker guarding one backend.
#[derive(Debug, Default)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    const fn enabled(&self) -> bool {
        self.config.failure_threshold > 0
    }

    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.config.cooldown_ms)
    }

    /// Current state, for inspection.
    pub fn state(&self) -> CircuitState {
        let Ok(state) = self.state.lock() else {
            return CircuitState::Closed;
        };
        match *state {
            State::Closed { .. } => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen => CircuitState::HalfOpen,
        }
    }

    /// Whether a call may proceed.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// admits exactly this caller; later callers are rejected until the probe
    /// reports back.
    pub fn is_available(&self) -> bool {
        if !self.enabled() {
            return true;
        }
        // A poisoned lock fails open.
        let Ok(mut state) = self.state.lock() else {
            return true;
        };
        match *state {
            State::Closed { .. } => true,
            State::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown() {
                    info!("circuit half-open, allowing probe request");
                    *state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => false,
        }
    }

    /// Admit one call, or `None` if the circuit rejects it.
    ///
    /// The returned [`Admission`] must be settled with
    /// [`succeeded`](Admission::succeeded) or [`failed`](Admission::failed).
    /// Dropping it unsettled (the call was cancelled or its future dropped)
    /// [`release`](Self::release)s a half-open probe.
    pub fn admit(&self) -> Option<Admission<'_>> {
        self.is_available().then_some(Admission {
            breaker: self,
            settled: false,
        })
    }

    /// Record a successful call. Closes the circuit.
    pub fn record_success(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if matches!(*state, State::HalfOpen) {
            info!("circuit recovered, probe succeeded");
        }
        *state = State::default();
    }

    /// Record a failed call. May trip the circuit.
    pub fn record_failure(&self) {
        if !self.enabled() {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let now = Instant::now();
        let window = Duration::from_millis(self.config.failure_window_ms);

        match &mut *state {
            State::Closed { failures } => {
                failures.push(now);
                failures.retain(|t| now.duration_since(*t) < window);
                if failures.len() >= self.config.failure_threshold as usize {
                    warn!(
                        failures = failures.len(),
                        cooldown_ms = self.config.cooldown_ms,
                        "circuit tripped"
                    );
                    *state = State::Open { tripped_at: now };
                }
            }
            State::HalfOpen => {
                warn!("probe failed, circuit re-opened");
                *state = State::Open { tripped_at: now };
            }
            State::Open { .. } => {}
        }
    }

    /// Give up an admitted call without an outcome (e.g. it was cancelled).
    ///
    /// A half-open probe goes back to open with its cooldown already spent,
    /// so the next caller becomes the probe.
    pub fn release(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if matches!(*state, State::HalfOpen) {
            let now = Instant::now();
            let tripped_at = now.checked_sub(self.cooldown()).unwrap_or(now);
            *state = State::Open { tripped_at };
        }
    }
}

/// An admitted call that has not reported its outcome yet.
#[derive(Debug)]
#[must_use = "an unsettled admission releases the probe when dropped"]
pub struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Admission<'_> {
    /// The call succeeded.
    pub fn succeeded(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    /// The call failed.
    pub fn failed(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release();
        }
    }
}
