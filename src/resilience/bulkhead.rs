//! Bulkhead: caps calls in flight.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::BulkheadConfig;
use crate::context::Context;
use crate::error::{BoxError, ResilienceError};

/// Semaphore-backed concurrency cap.
#[derive(Debug)]
pub struct Bulkhead {
    config: BulkheadConfig,
    permits: Arc<Semaphore>,
}

/// A held slot; released on drop.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}

impl Bulkhead {
    pub fn new(config: BulkheadConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self { config, permits }
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Take a slot, waiting at most `max_wait` (zero rejects immediately).
    pub async fn acquire(&self, ctx: &Context) -> Result<BulkheadPermit, BoxError> {
        let max_wait = self.config.max_wait();
        if max_wait.is_zero() {
            return match self.permits.clone().try_acquire_owned() {
                Ok(permit) => Ok(BulkheadPermit { _permit: permit }),
                Err(_) => {
                    tracing::debug!(max_concurrent = self.config.max_concurrent, "Bulkhead full");
                    Err(ResilienceError::BulkheadFull.into())
                }
            };
        }

        let wait = tokio::time::timeout(max_wait, self.permits.clone().acquire_owned());
        match ctx.run(wait).await? {
            Ok(Ok(permit)) => Ok(BulkheadPermit { _permit: permit }),
            Ok(Err(_closed)) => Err(ResilienceError::BulkheadFull.into()),
            Err(_elapsed) => {
                tracing::debug!(
                    max_wait_ms = self.config.max_wait_ms,
                    "Bulkhead wait timed out"
                );
                Err(ResilienceError::BulkheadTimeout.into())
            }
        }
    }
}
