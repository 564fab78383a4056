//! Structured logging around provider calls.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;
use crate::middleware::{Middleware, SharedProvider};
use crate::provider::{Closeable, Health, Initializable, Provider, RequestResponse};

/// Logs every call with the provider name, duration and outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

pub fn with_logging() -> LoggingMiddleware {
    LoggingMiddleware
}

impl<I, O> Middleware<I, O> for LoggingMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn wrap(&self, inner: SharedProvider<I, O>) -> SharedProvider<I, O> {
        Arc::new(Logged { inner })
    }
}

pub struct Logged<I, O> {
    inner: SharedProvider<I, O>,
}

#[async_trait]
impl<I, O> Provider for Logged<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn is_available(&self, ctx: &Context) -> bool {
        self.inner.is_available(ctx).await
    }

    async fn health(&self, ctx: &Context) -> Health {
        self.inner.health(ctx).await
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        self.inner.as_initializable()
    }

    fn as_closeable(&self) -> Option<&dyn Closeable> {
        self.inner.as_closeable()
    }
}

#[async_trait]
impl<I, O> RequestResponse<I, O> for Logged<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError> {
        let start = Instant::now();
        let result = self.inner.execute(ctx, input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::debug!(
                provider = %self.inner.name(),
                duration_ms,
                "Provider call succeeded"
            ),
            Err(e) => tracing::error!(
                provider = %self.inner.name(),
                duration_ms,
                error = %e,
                "Provider call failed"
            ),
        }
        result
    }
}
