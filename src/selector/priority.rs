//! Priority selection strategy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::provider::Provider;
use crate::selector::Selector;

/// Walks an explicit name list and returns the first available entry.
/// Names outside the list are never considered.
#[derive(Debug, Clone, Default)]
pub struct PrioritySelector {
    order: Vec<String>,
}

impl PrioritySelector {
    pub fn new<S: Into<String>>(order: impl IntoIterator<Item = S>) -> Self {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }
}

#[async_trait]
impl<P> Selector<P> for PrioritySelector
where
    P: ?Sized + Provider + 'static,
{
    async fn select(
        &self,
        ctx: &Context,
        providers: &HashMap<String, Arc<P>>,
    ) -> Result<Arc<P>, Error> {
        for name in &self.order {
            if let Some(provider) = providers.get(name) {
                if provider.is_available(ctx).await {
                    return Ok(provider.clone());
                }
                tracing::debug!(provider = %name, "Priority candidate unavailable, trying next");
            }
        }
        Err(Error::NoPriorityProvider)
    }
}
