//! Middleware for request/response providers.
//!
//! # Data Flow
//! ```text
//! chain([m1, m2, m3]).wrap(provider)
//!     → m1 pre → m2 pre → m3 pre → provider → m3 post → m2 post → m1 post
//!
//! Decorators:
//!     → logging.rs (name, duration, outcome)
//!     → tracing.rs (span "<service>.<provider>")
//!     → metrics.rs (request counter, duration histogram, error counter)
//! ```
//!
//! # Design Decisions
//! - A middleware is a value with a single `wrap` operation
//! - The first middleware in a chain is the outermost
//! - Decorators delegate name/availability/lifecycle to the inner provider

pub mod logging;
pub mod metrics;
pub mod tracing;

use std::fmt;
use std::sync::Arc;

use crate::provider::RequestResponse;

pub use self::logging::{with_logging, Logged, LoggingMiddleware};
pub use self::metrics::{with_metrics, Metered, MetricsMiddleware};
pub use self::tracing::{with_tracing, Traced, TracingMiddleware};

/// Shorthand for a shared request/response provider.
pub type SharedProvider<I, O> = Arc<dyn RequestResponse<I, O>>;

/// Turns one request/response provider into another.
pub trait Middleware<I, O>: Send + Sync {
    fn wrap(&self, inner: SharedProvider<I, O>) -> SharedProvider<I, O>;
}

/// Middleware backed by a plain function.
pub struct MiddlewareFn<F>(F);

/// Build a middleware from a wrapping function.
pub fn middleware_fn<I, O, F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(SharedProvider<I, O>) -> SharedProvider<I, O> + Send + Sync,
{
    MiddlewareFn(f)
}

impl<I, O, F> Middleware<I, O> for MiddlewareFn<F>
where
    F: Fn(SharedProvider<I, O>) -> SharedProvider<I, O> + Send + Sync,
{
    fn wrap(&self, inner: SharedProvider<I, O>) -> SharedProvider<I, O> {
        (self.0)(inner)
    }
}

/// Ordered composition; the first entry is the outermost.
pub struct Chain<I, O> {
    layers: Vec<Arc<dyn Middleware<I, O>>>,
}

impl<I, O> Default for Chain<I, O> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

impl<I, O> fmt::Debug for Chain<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("layers", &self.layers.len()).finish()
    }
}

impl<I, O> Chain<I, O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware inside the ones already added.
    pub fn layer(mut self, middleware: impl Middleware<I, O> + 'static) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Compose `middlewares` so the first one is the outermost.
pub fn chain<I, O>(middlewares: impl IntoIterator<Item = Arc<dyn Middleware<I, O>>>) -> Chain<I, O> {
    Chain {
        layers: middlewares.into_iter().collect(),
    }
}

impl<I, O> Middleware<I, O> for Chain<I, O> {
    fn wrap(&self, inner: SharedProvider<I, O>) -> SharedProvider<I, O> {
        self.layers
            .iter()
            .rev()
            .fold(inner, |wrapped, middleware| middleware.wrap(wrapped))
    }
}
