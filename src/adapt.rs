//! Adapt a backend-shaped provider to a domain-shaped one.
//!
//! `map_in` runs first; when it fails the backend is never called. After a
//! successful backend call `map_out` converts the result, and its error is
//! returned as is. Availability, health and lifecycle hooks come from the
//! backend; only the name belongs to the adapter.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;
use crate::provider::{Closeable, Health, Initializable, Provider, RequestResponse};

pub type MapIn<I, BI> = Arc<dyn Fn(&Context, I) -> Result<BI, BoxError> + Send + Sync>;
pub type MapOut<BO, O> = Arc<dyn Fn(BO) -> Result<O, BoxError> + Send + Sync>;

pub struct Adapter<I, O, BI, BO> {
    name: String,
    backend: Arc<dyn RequestResponse<BI, BO>>,
    map_in: MapIn<I, BI>,
    map_out: MapOut<BO, O>,
}

impl<I, O, BI, BO> Adapter<I, O, BI, BO> {
    pub fn new(
        name: impl Into<String>,
        backend: Arc<dyn RequestResponse<BI, BO>>,
        map_in: impl Fn(&Context, I) -> Result<BI, BoxError> + Send + Sync + 'static,
        map_out: impl Fn(BO) -> Result<O, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            backend,
            map_in: Arc::new(map_in),
            map_out: Arc::new(map_out),
        }
    }

    pub fn backend(&self) -> &Arc<dyn RequestResponse<BI, BO>> {
        &self.backend
    }
}

/// Shorthand for `Arc::new(Adapter::new(..))` as a trait object.
pub fn adapt<I, O, BI, BO>(
    name: impl Into<String>,
    backend: Arc<dyn RequestResponse<BI, BO>>,
    map_in: impl Fn(&Context, I) -> Result<BI, BoxError> + Send + Sync + 'static,
    map_out: impl Fn(BO) -> Result<O, BoxError> + Send + Sync + 'static,
) -> Arc<dyn RequestResponse<I, O>>
where
    I: Send + 'static,
    O: Send + 'static,
    BI: Send + 'static,
    BO: Send + 'static,
{
    Arc::new(Adapter::new(name, backend, map_in, map_out))
}

#[async_trait]
impl<I, O, BI, BO> Provider for Adapter<I, O, BI, BO>
where
    I: Send + 'static,
    O: Send + 'static,
    BI: Send + 'static,
    BO: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self, ctx: &Context) -> bool {
        self.backend.is_available(ctx).await
    }

    async fn health(&self, ctx: &Context) -> Health {
        self.backend.health(ctx).await
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        self.backend.as_initializable()
    }

    fn as_closeable(&self) -> Option<&dyn Closeable> {
        self.backend.as_closeable()
    }
}

#[async_trait]
impl<I, O, BI, BO> RequestResponse<I, O> for Adapter<I, O, BI, BO>
where
    I: Send + 'static,
    O: Send + 'static,
    BI: Send + 'static,
    BO: Send + 'static,
{
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError> {
        let request = (self.map_in)(ctx, input)?;
        let response = self.backend.execute(ctx, request).await?;
        (self.map_out)(response)
    }
}
