//! Provider contract and interaction shapes.
//!
//! # Data Flow
//! ```text
//! Composition root:
//!     → registry.rs (named factories + instance cache)
//!     → manager.rs (initialize, select, default override, close)
//!     → selector (choose one instance at call time)
//!
//! Call site:
//!     → Arc<dyn RequestResponse<I, O>> / Stream / Sink / Duplex
//!     → wrappers (middleware, resilience, stateful, adapt) implement the same shape
//! ```
//!
//! # Design Decisions
//! - Four shapes cover request/response, streaming, fire-and-forget and duplex
//! - Every shape extends `Provider` (name + availability)
//! - Init/close are opt-in capabilities discovered via `as_initializable` / `as_closeable`

pub mod manager;
pub mod registry;

use std::collections::BTreeMap;
use std::collections::VecDeque;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::BoxError;

pub use manager::Manager;
pub use registry::{Factory, Registry};

/// Coarse health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Unknown,
    Healthy,
    Degraded,
    Unhealthy,
}

/// Richer health report than `is_available`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: HealthStatus,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

impl Health {
    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy, "available")
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Unhealthy, message)
    }

    pub fn with_status(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Called once by a `Manager` before first use.
#[async_trait]
pub trait Initializable: Send + Sync {
    async fn init(&self, ctx: &Context) -> Result<(), BoxError>;
}

/// Called once at shutdown by `Manager::close_all`.
#[async_trait]
pub trait Closeable: Send + Sync {
    async fn close(&self, ctx: &Context) -> Result<(), BoxError>;
}

/// Base contract shared by every interaction shape.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique provider name.
    fn name(&self) -> &str;

    /// Evaluated at call time; implementations may perform I/O.
    async fn is_available(&self, ctx: &Context) -> bool;

    async fn health(&self, ctx: &Context) -> Health {
        if self.is_available(ctx).await {
            Health::healthy()
        } else {
            Health::unhealthy("unavailable")
        }
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        None
    }

    fn as_closeable(&self) -> Option<&dyn Closeable> {
        None
    }
}

/// One input, one output.
#[async_trait]
pub trait RequestResponse<I, O>: Provider {
    async fn execute(&self, ctx: &Context, input: I) -> Result<O, BoxError>;
}

/// Pull-based iterator returned by a `Stream` provider. Not restartable.
#[async_trait]
pub trait PullIter<O>: Send {
    /// `Ok(None)` once the stream is exhausted.
    async fn next(&mut self, ctx: &Context) -> Result<Option<O>, BoxError>;

    /// Releases any resources held by the iterator.
    async fn close(&mut self) -> Result<(), BoxError>;
}

/// One input, many outputs.
#[async_trait]
pub trait Stream<I, O>: Provider {
    async fn execute(&self, ctx: &Context, input: I) -> Result<Box<dyn PullIter<O>>, BoxError>;
}

/// Fire-and-forget; only an acknowledgment comes back.
#[async_trait]
pub trait Sink<I>: Provider {
    async fn send(&self, ctx: &Context, input: I) -> Result<(), BoxError>;
}

/// Open bidirectional stream. Each method may be driven from a different task.
#[async_trait]
pub trait DuplexStream<I, O>: Send + Sync {
    async fn send(&self, ctx: &Context, input: I) -> Result<(), BoxError>;

    /// `Ok(None)` once the remote side has finished.
    async fn recv(&self, ctx: &Context) -> Result<Option<O>, BoxError>;

    async fn close(&self) -> Result<(), BoxError>;
}

/// Opens bidirectional streams.
#[async_trait]
pub trait Duplex<I, O>: Provider {
    async fn open(&self, ctx: &Context) -> Result<Box<dyn DuplexStream<I, O>>, BoxError>;
}

/// `PullIter` over items already in memory.
pub struct VecIter<O> {
    items: VecDeque<O>,
    closed: bool,
}

/// Builds a `PullIter` that yields `items` in order.
pub fn vec_iter<O: Send + 'static>(items: Vec<O>) -> Box<dyn PullIter<O>> {
    Box::new(VecIter {
        items: items.into(),
        closed: false,
    })
}

#[async_trait]
impl<O: Send + 'static> PullIter<O> for VecIter<O> {
    async fn next(&mut self, _ctx: &Context) -> Result<Option<O>, BoxError> {
        if self.closed {
            return Err("iterator closed".into());
        }
        Ok(self.items.pop_front())
    }

    async fn close(&mut self) -> Result<(), BoxError> {
        self.closed = true;
        self.items.clear();
        Ok(())
    }
}
