//! Stateful wrapper: load per-key state, feed it into the call, persist
//! what the call produced.
//!
//! # Data Flow
//! ```text
//! execute(ctx, input)
//!     → key = key_fn(&input)
//!     → state = store.load(key)            (None on first call)
//!     → enriched = inject(input, state)
//!     → output = inner.execute(enriched)   (error: return, nothing saved)
//!     → extract(&enriched, &output)
//!         Some(new) → store.save(key, new, ttl), replacing the old value
//!         None      → previous state left as is
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;
use crate::provider::{Closeable, Health, Initializable, Provider, RequestResponse};
use crate::store::ContextStore;

pub type KeyFn<I> = Arc<dyn Fn(&I) -> String + Send + Sync>;
pub type InjectFn<I, C> = Arc<dyn Fn(I, Option<C>) -> I + Send + Sync>;
pub type ExtractFn<I, O, C> = Arc<dyn Fn(&I, &O) -> Option<C> + Send + Sync>;

/// Request/response provider that carries state across calls sharing a key.
pub struct Stateful<I, O, C> {
    inner: Arc<dyn RequestResponse<I, O>>,
    store: Arc<dyn ContextStore<C>>,
    key_fn: KeyFn<I>,
    inject: InjectFn<I, C>,
    extract: ExtractFn<I, O, C>,
    ttl: Duration,
}

impl<I, O, C> Stateful<I, O, C> {
    pub fn new(
        inner: Arc<dyn RequestResponse<I, O>>,
        store: Arc<dyn ContextStore<C>>,
        key_fn: impl Fn(&I) -> String + Send + Sync + 'static,
        inject: impl Fn(I, Option<C>) -> I + Send + Sync + 'static,
        extract: impl Fn(&I, &O) -> Option<C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            store,
            key_fn: Arc::new(key_fn),
            inject: Arc::new(inject),
            extract: Arc::new(extract),
            ttl: Duration::ZERO,
        }
    }

    /// Expiry for saved state; zero keeps it forever.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl<I, O, C> Provider for Stateful<I, O, C>
where
    I: Send + 'static,
    O: Send + 'static,
    C: Send + 'static,
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
impl<I, O, C> RequestResponse<I, O> for Stateful<I, O, C>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
    C: Send + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError> {
        let key = (self.key_fn)(&input);
        let state = self.store.load(ctx, &key).await?;
        let enriched = (self.inject)(input, state);

        let output = self.inner.execute(ctx, enriched.clone()).await?;

        if let Some(next) = (self.extract)(&enriched, &output) {
            self.store.save(ctx, &key, next, self.ttl).await?;
            tracing::trace!(provider = %self.inner.name(), key = %key, "State saved");
        }
        Ok(output)
    }
}
