//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ManagerConfig (validated, immutable)
//!     → Manager::from_config / Manager::initialize_from_config
//!
//! Per provider:
//!     → settings.rs (opaque bag handed to the factory)
//!     → ResilienceConfig (consumed by resilience wrappers)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BulkheadConfig, CircuitBreakerConfig, ManagerConfig, ProviderEntry, RateLimiterConfig,
    ResilienceConfig, RetryConfig, RetryPredicate, SelectorConfig,
};
pub use settings::ProviderSettings;
pub use validation::{validate_config, ValidationError};
