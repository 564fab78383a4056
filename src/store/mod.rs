//! Per-key state persistence for stateful providers.
//!
//! # Contract
//! - `load` returns `Ok(None)` when the key is absent
//! - `save` with a zero TTL never expires
//! - `delete` is idempotent

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;

pub use memory::InMemoryStore;

#[async_trait]
pub trait ContextStore<C>: Send + Sync {
    async fn load(&self, ctx: &Context, key: &str) -> Result<Option<C>, BoxError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn save(&self, ctx: &Context, key: &str, value: C, ttl: Duration) -> Result<(), BoxError>;

    async fn delete(&self, ctx: &Context, key: &str) -> Result<(), BoxError>;
}
