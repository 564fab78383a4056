//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed operation up to `max_attempts` times in total
//! - Sleep with exponential backoff + jitter between attempts
//! - Stop early on non-retryable errors and on cancellation
//!
//! # Design Decisions
//! - The context is checked before every attempt and during every sleep
//! - Context errors are never retried
//! - Jittered backoff prevents thundering herd

use std::future::Future;

use crate::config::RetryConfig;
use crate::context::{Context, ContextError};
use crate::error::BoxError;
use crate::resilience::backoff::calculate_backoff;

/// Runs operations under a retry policy.
#[derive(Debug, Clone)]
pub struct Retrier {
    config: RetryConfig,
}

impl Retrier {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    fn should_retry(&self, err: &BoxError) -> bool {
        if err.is::<ContextError>() {
            return false;
        }
        match &self.config.retryable {
            Some(predicate) => predicate.is_retryable(err),
            None => true,
        }
    }

    /// Run `op` until it succeeds, attempts run out, or the error is not retryable.
    pub async fn run<T, F, Fut>(&self, ctx: &Context, mut op: F) -> Result<T, BoxError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;
        loop {
            if let Some(e) = ctx.err() {
                return Err(e.into());
            }
            attempt += 1;

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= max_attempts || !self.should_retry(&err) {
                return Err(err);
            }

            let delay = calculate_backoff(
                attempt,
                self.config.initial_backoff(),
                self.config.backoff_factor,
                self.config.max_backoff(),
            );
            tracing::debug!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying"
            );
            ctx.sleep(delay).await?;
        }
    }
}
