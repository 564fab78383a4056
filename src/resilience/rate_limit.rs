//! Token bucket rate limiter.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::RateLimiterConfig;
use crate::context::Context;
use crate::error::{BoxError, ResilienceError};

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Take a token, or report how long until one is available.
    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> Result<(), Option<Duration>> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        if refill_rate <= 0.0 {
            return Err(None);
        }
        // A refill too slow to express as a Duration never arrives.
        Duration::try_from_secs_f64((1.0 - self.tokens) / refill_rate)
            .map_or(Err(None), |delay| Err(Some(delay)))
    }
}

/// Steady-rate limiter with a burst allowance.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(config: &RateLimiterConfig) -> Self {
        let burst = f64::from(config.burst.max(1));
        Self {
            rate: config.rate,
            burst,
            bucket: Mutex::new(TokenBucket::new(burst)),
        }
    }

    fn acquire_or_delay(&self) -> Result<(), Option<Duration>> {
        self.bucket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire(self.burst, self.rate)
    }

    /// Non-blocking attempt to take a token.
    pub fn try_acquire(&self) -> bool {
        self.acquire_or_delay().is_ok()
    }

    /// Wait for a token. Bounded by the context.
    pub async fn wait(&self, ctx: &Context) -> Result<(), BoxError> {
        loop {
            if let Some(e) = ctx.err() {
                return Err(e.into());
            }
            match self.acquire_or_delay() {
                Ok(()) => return Ok(()),
                Err(None) => {
                    tracing::debug!(rate = self.rate, "Rate limiter exhausted with no refill");
                    return Err(ResilienceError::RateLimited.into());
                }
                Err(Some(delay)) => ctx.sleep(delay).await?,
            }
        }
    }
}
