//! In-memory `ContextStore`.
//!
//! Expiration is checked lazily on `load`; there is no background sweep.
//! Not suitable for production: entries live in a single process and are
//! lost on restart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::context::Context;
use crate::error::BoxError;
use crate::store::ContextStore;

#[derive(Debug, Clone)]
struct Entry<C> {
    value: C,
    expires_at: Option<Instant>,
}

impl<C> Entry<C> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe map of key to state. Clones share the same entries.
#[derive(Debug)]
pub struct InMemoryStore<C> {
    entries: Arc<DashMap<String, Entry<C>>>,
}

impl<C> Clone for InMemoryStore<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C> Default for InMemoryStore<C> {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl<C> InMemoryStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry count, including expired entries no `load` has visited yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl<C> ContextStore<C> for InMemoryStore<C>
where
    C: Clone + Send + Sync + 'static,
{
    async fn load(&self, ctx: &Context, key: &str) -> Result<Option<C>, BoxError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let now = Instant::now();
        let found = match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => None,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };

        // The read guard is released before removing.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        tracing::trace!(key, "Expired state evicted on load");
        Ok(found)
    }

    async fn save(&self, ctx: &Context, key: &str, value: C, ttl: Duration) -> Result<(), BoxError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        // Zero, or too far out to represent, means no expiry.
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, _ctx: &Context, key: &str) -> Result<(), BoxError> {
        self.entries.remove(key);
        Ok(())
    }
}
