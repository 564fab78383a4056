//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Durations are expressed as integer `*_ms` fields.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::error::BoxError;

/// Root configuration for a provider `Manager`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ManagerConfig {
    /// Provider every `get` is routed to, bypassing the selector.
    pub default: Option<String>,

    /// Selection strategy used when no default is set.
    pub selector: SelectorConfig,

    /// Providers to initialize, in order.
    pub providers: Vec<ProviderEntry>,
}

/// Selection strategy.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SelectorConfig {
    /// First available provider from an explicit ordered list.
    Priority { order: Vec<String> },
    #[default]
    RoundRobin,
    HealthCheck,
}

/// A provider to initialize.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEntry {
    /// Instance name.
    pub name: String,

    /// Registered factory to build it with (default: `name`).
    #[serde(default)]
    pub factory: Option<String>,

    /// Opaque settings handed to the factory.
    #[serde(default)]
    pub settings: ProviderSettings,

    /// Resilience to apply around the instance. The wrapper depends on the
    /// interaction shape, so it is applied through
    /// `Manager::initialize_from_config_with`.
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

impl ProviderEntry {
    pub fn factory_name(&self) -> &str {
        self.factory.as_deref().unwrap_or(&self.name)
    }
}

/// Resilience configuration. Every sub-config is optional.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResilienceConfig {
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    pub retry: Option<RetryConfig>,
    pub rate_limiter: Option<RateLimiterConfig>,
    pub bulkhead: Option<BulkheadConfig>,
}

impl ResilienceConfig {
    /// True when nothing is configured; wrappers then pass the provider through untouched.
    pub fn is_empty(&self) -> bool {
        self.circuit_breaker.is_none()
            && self.retry.is_none()
            && self.rate_limiter.is_none()
            && self.bulkhead.is_none()
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    pub fn with_rate_limiter(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limiter = Some(config);
        self
    }

    pub fn with_bulkhead(mut self, config: BulkheadConfig) -> Self {
        self.bulkhead = Some(config);
        self
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub max_failures: u32,

    /// Time spent open before probing, in milliseconds.
    pub timeout_ms: u64,

    /// Trial calls admitted while half-open.
    pub half_open_max_requests: u32,
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            timeout_ms: 30_000,
            half_open_max_requests: 1,
        }
    }
}

/// Decides whether an error is worth another attempt.
#[derive(Clone)]
pub struct RetryPredicate(Arc<dyn Fn(&BoxError) -> bool + Send + Sync>);

impl RetryPredicate {
    pub fn new(f: impl Fn(&BoxError) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn is_retryable(&self, err: &BoxError) -> bool {
        (self.0)(err)
    }
}

impl fmt::Debug for RetryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryPredicate(..)")
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds.
    pub initial_backoff_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub max_backoff_ms: u64,

    /// Growth factor applied to the delay after each attempt.
    pub backoff_factor: f64,

    /// Runtime-only; every error is retried when unset.
    #[serde(skip)]
    pub retryable: Option<RetryPredicate>,
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn with_predicate(mut self, f: impl Fn(&BoxError) -> bool + Send + Sync + 'static) -> Self {
        self.retryable = Some(RetryPredicate::new(f));
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
            backoff_factor: 2.0,
            retryable: None,
        }
    }
}

/// Token bucket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Steady refill rate in tokens per second.
    pub rate: f64,

    /// Bucket capacity.
    pub burst: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            rate: 100.0,
            burst: 50,
        }
    }
}

/// Bulkhead configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BulkheadConfig {
    /// Maximum calls in flight.
    pub max_concurrent: usize,

    /// How long to wait for a slot in milliseconds; 0 rejects immediately.
    pub max_wait_ms: u64,
}

impl BulkheadConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_wait_ms: 0,
        }
    }
}
