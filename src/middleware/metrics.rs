//! Call metrics for request/response providers.
//!
//! # Metrics
//! - `provider_requests_total` (counter): calls by operation, status
//! - `provider_request_duration_seconds` (histogram): latency by operation
//! - `provider_errors_total` (counter): failed calls by operation
//!
//! The operation label is the provider name. Metrics go to whatever
//! recorder the application installed; without one they are dropped.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;
use crate::middleware::{Middleware, SharedProvider};
use crate::provider::{Closeable, Health, Initializable, Provider, RequestResponse};

pub const REQUESTS_TOTAL: &str = "provider_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "provider_request_duration_seconds";
pub const ERRORS_TOTAL: &str = "provider_errors_total";

/// Record one finished call.
pub fn record_call(operation: &str, success: bool, start: Instant) {
    let status = if success { "success" } else { "error" };
    let operation = operation.to_string();

    metrics::counter!(REQUESTS_TOTAL, "operation" => operation.clone(), "status" => status)
        .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "operation" => operation.clone())
        .record(start.elapsed().as_secs_f64());
    if !success {
        metrics::counter!(ERRORS_TOTAL, "operation" => operation).increment(1);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsMiddleware;

pub fn with_metrics() -> MetricsMiddleware {
    MetricsMiddleware
}

impl<I, O> Middleware<I, O> for MetricsMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn wrap(&self, inner: SharedProvider<I, O>) -> SharedProvider<I, O> {
        Arc::new(Metered { inner })
    }
}

pub struct Metered<I, O> {
    inner: SharedProvider<I, O>,
}

#[async_trait]
impl<I, O> Provider for Metered<I, O>
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
impl<I, O> RequestResponse<I, O> for Metered<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError> {
        let start = Instant::now();
        let result = self.inner.execute(ctx, input).await;
        record_call(self.inner.name(), result.is_ok(), start);
        result
    }
}
