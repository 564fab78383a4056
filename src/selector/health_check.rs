//! Health-check selection strategy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::provider::Provider;
use crate::selector::{sorted_names, Selector};

/// Returns the first available provider by sorted name.
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthCheckSelector;

impl HealthCheckSelector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl<P> Selector<P> for HealthCheckSelector
where
    P: ?Sized + Provider + 'static,
{
    async fn select(
        &self,
        ctx: &Context,
        providers: &HashMap<String, Arc<P>>,
    ) -> Result<Arc<P>, Error> {
        for name in sorted_names(providers) {
            let provider = &providers[name];
            if provider.is_available(ctx).await {
                return Ok(provider.clone());
            }
        }
        Err(Error::NoAvailableProvider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::testing::pool;

    #[tokio::test]
    async fn test_first_available_by_name() {
        let ctx = Context::background();
        let providers = pool(&[("charlie", true), ("alpha", false), ("bravo", true)]);

        let chosen = HealthCheckSelector::new().select(&ctx, &providers).await.unwrap();
        assert_eq!(chosen.name(), "bravo");
    }

    #[tokio::test]
    async fn test_errors_when_none_available() {
        let ctx = Context::background();
        let providers = pool(&[("alpha", false)]);

        let err = HealthCheckSelector::new().select(&ctx, &providers).await.unwrap_err();
        assert!(matches!(err, Error::NoAvailableProvider));
    }
}
