//! Provider selection strategies.
//!
//! # Data Flow
//! ```text
//! Manager::get (no default configured)
//!     → snapshot of initialized providers (lock released)
//!     → Selector::select:
//!         - priority.rs (first available in an explicit order)
//!         - round_robin.rs (rotate through sorted names)
//!         - health_check.rs (first available by name)
//!     → chosen provider or error
//! ```
//!
//! # Design Decisions
//! - Selectors are stateless apart from the round-robin counter
//! - Availability is evaluated at selection time, never cached
//! - Sorting names makes choices deterministic across HashMap orderings

pub mod health_check;
pub mod priority;
pub mod round_robin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SelectorConfig;
use crate::context::Context;
use crate::error::Error;
use crate::provider::Provider;

pub use health_check::HealthCheckSelector;
pub use priority::PrioritySelector;
pub use round_robin::RoundRobinSelector;

/// Chooses one provider from a name → instance snapshot.
#[async_trait]
pub trait Selector<P: ?Sized + Provider>: Send + Sync {
    async fn select(
        &self,
        ctx: &Context,
        providers: &HashMap<String, Arc<P>>,
    ) -> Result<Arc<P>, Error>;
}

/// Candidate names in sorted order.
pub(crate) fn sorted_names<P: ?Sized>(providers: &HashMap<String, Arc<P>>) -> Vec<&str> {
    let mut names: Vec<&str> = providers.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Build the selector described by `config`.
pub fn selector_from_config<P>(config: &SelectorConfig) -> Box<dyn Selector<P>>
where
    P: ?Sized + Provider + 'static,
{
    match config {
        SelectorConfig::Priority { order } => Box::new(PrioritySelector::new(order.clone())),
        SelectorConfig::RoundRobin => Box::new(RoundRobinSelector::new()),
        SelectorConfig::HealthCheck => Box::new(HealthCheckSelector::new()),
    }
}
