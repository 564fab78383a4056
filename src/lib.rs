//! Provider abstraction and resilience composition.
//!
//! Backends are exposed as named providers in one of four interaction
//! shapes, created through a `Registry`, owned and selected by a `Manager`,
//! and decorated with middleware, resilience, per-key state or type
//! adaptation without changing the shape callers see.

pub mod adapt;
pub mod config;
pub mod context;
pub mod error;
pub mod middleware;
pub mod provider;
pub mod resilience;
pub mod selector;
pub mod stateful;
pub mod store;
pub mod telemetry;

pub use adapt::{adapt, Adapter};
pub use config::{ManagerConfig, ProviderSettings, ResilienceConfig};
pub use context::{Context, ContextError};
pub use error::{BoxError, DomainError, Error, ErrorCode, ResilienceError};
pub use middleware::{chain, Middleware};
pub use provider::{
    Duplex, DuplexStream, Manager, Provider, PullIter, Registry, RequestResponse, Sink, Stream,
};
pub use resilience::{
    with_resilience, with_resilience_duplex, with_resilience_sink, with_resilience_stream,
};
pub use selector::{HealthCheckSelector, PrioritySelector, RoundRobinSelector, Selector};
pub use stateful::Stateful;
pub use store::{ContextStore, InMemoryStore};
