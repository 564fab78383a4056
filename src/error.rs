//! Error types.
//!
//! # Categories
//! - Configuration/usage errors (`Error`): returned directly, never translated
//! - Backend errors (`BoxError` from a provider): passed through every layer unchanged
//! - Resilience sentinels (`ResilienceError`, `ContextError`): reclassified into
//!   a `DomainError` by `translate`, which keeps the sentinel as its source

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

pub use crate::context::ContextError;

/// Error type returned by providers and by every wrapper around them.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Configuration and usage errors raised by registries, managers and selectors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("factory {0} not registered")]
    FactoryNotRegistered(String),

    #[error("factory {name} failed: {source}")]
    Factory {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("provider {0} not found")]
    ProviderNotFound(String),

    #[error("default provider {0} not found")]
    DefaultProviderNotFound(String),

    #[error("provider {0} not initialized")]
    NotInitialized(String),

    #[error("init provider {name}: {source}")]
    Init {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("no available provider found in priority list")]
    NoPriorityProvider,

    #[error("no providers to select from")]
    NoProviders,

    #[error("no available provider")]
    NoAvailableProvider,

    #[error("failed to close {} provider(s): {}", .0.len(), join_failures(.0))]
    Close(Vec<CloseFailure>),
}

/// A single provider that failed to close during `Manager::close_all`.
#[derive(Debug)]
pub struct CloseFailure {
    pub name: String,
    pub source: BoxError,
}

fn join_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.name, f.source))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sentinel errors raised by the resilience primitives themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResilienceError {
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("bulkhead is full")]
    BulkheadFull,
    #[error("bulkhead wait timed out")]
    BulkheadTimeout,
}

/// Any error that resilience translation recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Resilience(ResilienceError),
    Context(ContextError),
}

impl From<ResilienceError> for Sentinel {
    fn from(e: ResilienceError) -> Self {
        Sentinel::Resilience(e)
    }
}

impl From<ContextError> for Sentinel {
    fn from(e: ContextError) -> Self {
        Sentinel::Context(e)
    }
}

/// Stable error codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unavailable,
    RateLimited,
    ResourceExhausted,
    Timeout,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resilience sentinel reclassified into a caller-facing error.
#[derive(Debug, Error)]
#[error("{code}: {source}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub retryable: bool,
    #[source]
    pub source: BoxError,
}

impl DomainError {
    fn from_sentinel(sentinel: Sentinel, source: BoxError) -> Self {
        let (code, retryable) = match sentinel {
            Sentinel::Resilience(ResilienceError::CircuitOpen) => (ErrorCode::Unavailable, true),
            Sentinel::Resilience(ResilienceError::RateLimited) => (ErrorCode::RateLimited, true),
            Sentinel::Resilience(ResilienceError::BulkheadFull)
            | Sentinel::Resilience(ResilienceError::BulkheadTimeout) => {
                (ErrorCode::ResourceExhausted, true)
            }
            Sentinel::Context(ContextError::DeadlineExceeded) => (ErrorCode::Timeout, true),
            Sentinel::Context(ContextError::Canceled) => (ErrorCode::Timeout, false),
        };
        Self { code, retryable, source }
    }
}

/// Returns the sentinel carried directly by `err`, if any.
fn sentinel_of(err: &(dyn StdError + 'static)) -> Option<Sentinel> {
    if let Some(e) = err.downcast_ref::<ResilienceError>() {
        return Some(Sentinel::Resilience(*e));
    }
    err.downcast_ref::<ContextError>().map(|e| Sentinel::Context(*e))
}

/// Finds the first sentinel in the `source()` chain of `err`.
pub fn find_sentinel(err: &(dyn StdError + 'static)) -> Option<Sentinel> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(s) = sentinel_of(e) {
            return Some(s);
        }
        current = e.source();
    }
    None
}

/// Identity check against a sentinel, looking through any wrapping.
pub fn is_sentinel(err: &(dyn StdError + 'static), sentinel: impl Into<Sentinel>) -> bool {
    find_sentinel(err) == Some(sentinel.into())
}

/// Returns the `DomainError` carried by `err`, if it is one.
pub fn as_domain<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a DomainError> {
    err.downcast_ref::<DomainError>()
}

/// Reclassifies resilience sentinels into a `DomainError`.
///
/// Idempotent: a `DomainError` comes back unchanged. Errors that are not
/// sentinels (i.e. anything a provider returned) pass through untouched.
pub fn translate(err: BoxError) -> BoxError {
    if err.is::<DomainError>() {
        return err;
    }
    match sentinel_of(err.as_ref()) {
        Some(sentinel) => Box::new(DomainError::from_sentinel(sentinel, err)),
        None => err,
    }
}
