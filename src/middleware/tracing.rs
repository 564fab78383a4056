//! Tracing spans around provider calls.
//!
//! Each call runs inside a `provider.call` span whose `otel.name` is
//! `<service>.<provider>`. Failures set the `error` field on the span.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::field::Empty;
use tracing::Instrument;

use crate::context::Context;
use crate::error::BoxError;
use crate::middleware::{Middleware, SharedProvider};
use crate::provider::{Closeable, Health, Initializable, Provider, RequestResponse};

#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    service: Arc<str>,
}

pub fn with_tracing(service: impl Into<String>) -> TracingMiddleware {
    TracingMiddleware {
        service: Arc::from(service.into()),
    }
}

impl<I, O> Middleware<I, O> for TracingMiddleware
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn wrap(&self, inner: SharedProvider<I, O>) -> SharedProvider<I, O> {
        Arc::new(Traced {
            service: self.service.clone(),
            inner,
        })
    }
}

pub struct Traced<I, O> {
    service: Arc<str>,
    inner: SharedProvider<I, O>,
}

impl<I, O> Traced<I, O> {
    /// Span name reported to the tracing backend.
    pub fn span_name(&self) -> String {
        format!("{}.{}", self.service, self.inner.name())
    }
}

#[async_trait]
impl<I, O> Provider for Traced<I, O>
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
impl<I, O> RequestResponse<I, O> for Traced<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError> {
        let span = tracing::info_span!(
            "provider.call",
            otel.name = %self.span_name(),
            service = %self.service,
            operation = %self.inner.name(),
            error = Empty,
        );

        let result = self
            .inner
            .execute(ctx, input)
            .instrument(span.clone())
            .await;

        if let Err(e) = &result {
            span.record("error", true);
            span.in_scope(|| tracing::warn!(error = %e, "Provider call returned error"));
        }
        result
    }
}
