//! Round-robin selection strategy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::provider::Provider;
use crate::selector::{sorted_names, Selector};

/// Round-robin selector.
/// Stores an internal counter to rotate through providers; unavailable ones are skipped.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<P> Selector<P> for RoundRobinSelector
where
    P: ?Sized + Provider + 'static,
{
    async fn select(
        &self,
        ctx: &Context,
        providers: &HashMap<String, Arc<P>>,
    ) -> Result<Arc<P>, Error> {
        if providers.is_empty() {
            return Err(Error::NoProviders);
        }

        let names = sorted_names(providers);
        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = names.len();

        for i in 0..len {
            let name = names[start.wrapping_add(i) % len];
            let provider = &providers[name];
            if provider.is_available(ctx).await {
                return Ok(provider.clone());
            }
        }
        Err(Error::NoAvailableProvider)
    }
}
