//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call through a resilient wrapper:
//!     → rate_limit.rs (wait for a token before anything acquires resources)
//!     → bulkhead.rs (hold a slot for the whole call, retries included)
//!     → circuit_breaker.rs (one success/failure per outer call)
//!     → retries.rs (every attempt happens inside the breaker's unit)
//!     → provider call
//! Errors raised by these layers are translated into DomainError on the way out.
//! ```
//!
//! # Design Decisions
//! - An empty config returns the provider itself (no wrapper, no overhead)
//! - Primitives are built once per wrapper and shared by all calls through it
//! - Duplex `open` never retries; reconnection belongs to the caller

pub mod backoff;
pub mod bulkhead;
pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;
pub mod wrappers;

use std::future::Future;
use std::sync::Arc;

use crate::config::ResilienceConfig;
use crate::context::Context;
use crate::error::{translate, BoxError};

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use rate_limit::RateLimiter;
pub use retries::Retrier;
pub use wrappers::{
    with_resilience, with_resilience_duplex, with_resilience_sink, with_resilience_stream,
    ResilientDuplex, ResilientRequestResponse, ResilientSink, ResilientStream,
};

/// Built, long-lived primitives for a non-empty `ResilienceConfig`.
#[derive(Debug, Clone, Default)]
pub struct ResilienceState {
    pub circuit_breaker: Option<Arc<CircuitBreaker>>,
    pub retrier: Option<Arc<Retrier>>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub bulkhead: Option<Arc<Bulkhead>>,
}

impl ResilienceState {
    pub fn is_empty(&self) -> bool {
        self.circuit_breaker.is_none()
            && self.retrier.is_none()
            && self.rate_limiter.is_none()
            && self.bulkhead.is_none()
    }

    /// Same primitives with the retry tier removed.
    pub fn without_retry(&self) -> Self {
        Self {
            circuit_breaker: self.circuit_breaker.clone(),
            retrier: None,
            rate_limiter: self.rate_limiter.clone(),
            bulkhead: self.bulkhead.clone(),
        }
    }
}

/// Build the primitives described by `config`.
pub fn build_resilience(config: &ResilienceConfig) -> ResilienceState {
    ResilienceState {
        circuit_breaker: config
            .circuit_breaker
            .clone()
            .map(|c| Arc::new(CircuitBreaker::new(c))),
        retrier: config.retry.clone().map(|c| Arc::new(Retrier::new(c))),
        rate_limiter: config
            .rate_limiter
            .as_ref()
            .map(|c| Arc::new(RateLimiter::new(c))),
        bulkhead: config.bulkhead.clone().map(|c| Arc::new(Bulkhead::new(c))),
    }
}

/// Run `op` through the configured layers.
///
/// Rate limiter wait first, then Bulkhead → CircuitBreaker → Retry → `op`.
pub async fn execute_with_resilience<T, F, Fut>(
    ctx: &Context,
    state: &ResilienceState,
    op: F,
) -> Result<T, BoxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    run_layers(ctx, state, op).await.map_err(translate)
}

async fn run_layers<T, F, Fut>(ctx: &Context, state: &ResilienceState, op: F) -> Result<T, BoxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    if let Some(limiter) = &state.rate_limiter {
        limiter.wait(ctx).await?;
    }

    let _permit = match &state.bulkhead {
        Some(bulkhead) => Some(bulkhead.acquire(ctx).await?),
        None => None,
    };

    let retried = || run_retry(ctx, state.retrier.as_deref(), op);
    match &state.circuit_breaker {
        Some(breaker) => breaker.call(retried).await,
        None => retried().await,
    }
}

async fn run_retry<T, F, Fut>(ctx: &Context, retrier: Option<&Retrier>, mut op: F) -> Result<T, BoxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    match retrier {
        Some(retrier) => retrier.run(ctx, op).await,
        None => op().await,
    }
}
