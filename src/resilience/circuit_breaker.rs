//! Circuit breaker for provider protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: provider assumed down, calls fail fast
//! - Half-Open: testing if provider recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= max_failures
//! Open → Half-Open: after timeout
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per wrapped provider (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - At most `half_open_max_requests` trial calls in Half-Open

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::error::{BoxError, ResilienceError};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
    trials_in_flight: u32,
}

/// Consecutive-failure circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                opened_at: None,
                trials_in_flight: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, without triggering the Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures recorded while closed.
    pub fn failures(&self) -> u32 {
        self.lock().failures
    }

    /// Admit or reject a call. Never blocks.
    pub fn try_acquire(&self) -> Result<(), ResilienceError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed < self.config.timeout() {
                    return Err(ResilienceError::CircuitOpen);
                }
                tracing::info!("Circuit breaker half-open, admitting trial call");
                inner.state = CircuitState::HalfOpen;
                inner.trials_in_flight = 1;
                Ok(())
            }
            CircuitState::HalfOpen => {
                if inner.trials_in_flight >= self.config.half_open_max_requests.max(1) {
                    return Err(ResilienceError::CircuitOpen);
                }
                inner.trials_in_flight += 1;
                Ok(())
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            tracing::info!("Circuit breaker closed after successful trial call");
        }
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.opened_at = None;
        inner.trials_in_flight = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.max_failures.max(1) {
                    tracing::warn!(failures = inner.failures, "Circuit breaker opened");
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Circuit breaker trial call failed, reopening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trials_in_flight = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Releases a trial slot for a call that finished without an outcome.
    fn release(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
        }
    }

    /// Run `f` as one unit of evaluation: any error counts as one failure.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        self.try_acquire()?;
        let mut guard = OutcomeGuard {
            breaker: self,
            recorded: false,
        };
        let result = f().await;
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        guard.recorded = true;
        result
    }
}

/// Frees a half-open trial slot if the call future is dropped mid-flight.
struct OutcomeGuard<'a> {
    breaker: &'a CircuitBreaker,
    recorded: bool,
}

impl Drop for OutcomeGuard<'_> {
    fn drop(&mut self) {
        if !self.recorded {
            self.breaker.release();
        }
    }
}
