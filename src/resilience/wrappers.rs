//! Resilient wrappers for each interaction shape.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ResilienceConfig;
use crate::context::Context;
use crate::error::BoxError;
use crate::provider::{
    Closeable, Duplex, DuplexStream, Health, Initializable, Provider, PullIter, RequestResponse,
    Sink, Stream,
};
use crate::resilience::{build_resilience, execute_with_resilience, ResilienceState};

/// Delegates the base `Provider` contract to the wrapped instance.
macro_rules! delegate_provider {
    ($wrapper:ident < $($param:ident),+ >) => {
        #[async_trait]
        impl<$($param),+> Provider for $wrapper<$($param),+>
        where
            $($param: Send + Sync + 'static),+
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
    };
}

/// Request/response provider behind the resilience chain.
pub struct ResilientRequestResponse<I, O> {
    inner: Arc<dyn RequestResponse<I, O>>,
    state: ResilienceState,
}

impl<I, O> ResilientRequestResponse<I, O> {
    pub fn state(&self) -> &ResilienceState {
        &self.state
    }
}

/// Wrap `provider` with the layers in `config`.
///
/// An empty config returns `provider` itself.
pub fn with_resilience<I, O>(
    provider: Arc<dyn RequestResponse<I, O>>,
    config: &ResilienceConfig,
) -> Arc<dyn RequestResponse<I, O>>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    if config.is_empty() {
        return provider;
    }
    Arc::new(ResilientRequestResponse {
        inner: provider,
        state: build_resilience(config),
    })
}

delegate_provider!(ResilientRequestResponse<I, O>);

#[async_trait]
impl<I, O> RequestResponse<I, O> for ResilientRequestResponse<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError> {
        execute_with_resilience(ctx, &self.state, || self.inner.execute(ctx, input.clone())).await
    }
}

/// Stream provider behind the resilience chain. Only `execute` is guarded;
/// pulling from the returned iterator is not.
pub struct ResilientStream<I, O> {
    inner: Arc<dyn Stream<I, O>>,
    state: ResilienceState,
}

pub fn with_resilience_stream<I, O>(
    provider: Arc<dyn Stream<I, O>>,
    config: &ResilienceConfig,
) -> Arc<dyn Stream<I, O>>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    if config.is_empty() {
        return provider;
    }
    Arc::new(ResilientStream {
        inner: provider,
        state: build_resilience(config),
    })
}

delegate_provider!(ResilientStream<I, O>);

#[async_trait]
impl<I, O> Stream<I, O> for ResilientStream<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<Box<dyn PullIter<O>>, BoxError> {
        execute_with_resilience(ctx, &self.state, || self.inner.execute(ctx, input.clone())).await
    }
}

/// Sink provider behind the resilience chain.
pub struct ResilientSink<I> {
    inner: Arc<dyn Sink<I>>,
    state: ResilienceState,
}

pub fn with_resilience_sink<I>(provider: Arc<dyn Sink<I>>, config: &ResilienceConfig) -> Arc<dyn Sink<I>>
where
    I: Clone + Send + Sync + 'static,
{
    if config.is_empty() {
        return provider;
    }
    Arc::new(ResilientSink {
        inner: provider,
        state: build_resilience(config),
    })
}

delegate_provider!(ResilientSink<I>);

#[async_trait]
impl<I> Sink<I> for ResilientSink<I>
where
    I: Clone + Send + Sync + 'static,
{
    async fn send(&self, ctx: &Context, input: I) -> Result<(), BoxError> {
        execute_with_resilience(ctx, &self.state, || self.inner.send(ctx, input.clone())).await
    }
}

/// Duplex provider behind the resilience chain, without the retry tier.
pub struct ResilientDuplex<I, O> {
    inner: Arc<dyn Duplex<I, O>>,
    state: ResilienceState,
}

pub fn with_resilience_duplex<I, O>(
    provider: Arc<dyn Duplex<I, O>>,
    config: &ResilienceConfig,
) -> Arc<dyn Duplex<I, O>>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    if config.is_empty() {
        return provider;
    }
    Arc::new(ResilientDuplex {
        inner: provider,
        state: build_resilience(config),
    })
}

delegate_provider!(ResilientDuplex<I, O>);

#[async_trait]
impl<I, O> Duplex<I, O> for ResilientDuplex<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn open(&self, ctx: &Context) -> Result<Box<dyn DuplexStream<I, O>>, BoxError> {
        // Derived per call from the shared primitives; retries never apply to open.
        let state = self.state.without_retry();
        execute_with_resilience(ctx, &state, || self.inner.open(ctx)).await
    }
}
