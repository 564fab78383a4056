//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default and priority names exist)
//! - Validate value ranges (attempts > 0, rates finite, capacities > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ManagerConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{ManagerConfig, ResilienceConfig, SelectorConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate provider name '{0}'")]
    DuplicateProvider(String),

    #[error("provider name must not be empty")]
    EmptyProviderName,

    #[error("default provider '{0}' is not configured")]
    UnknownDefault(String),

    #[error("priority selector needs at least one provider name")]
    EmptyPriorityList,

    #[error("priority list references unknown provider '{0}'")]
    UnknownPriorityProvider(String),

    #[error("provider '{provider}': {field} {reason}")]
    InvalidValue {
        provider: String,
        field: &'static str,
        reason: &'static str,
    },
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &ManagerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for entry in &config.providers {
        if entry.name.is_empty() {
            errors.push(ValidationError::EmptyProviderName);
        } else if !names.insert(entry.name.as_str()) {
            errors.push(ValidationError::DuplicateProvider(entry.name.clone()));
        }
        validate_resilience(&entry.name, &entry.resilience, &mut errors);
    }

    if let Some(default) = &config.default {
        if !names.contains(default.as_str()) {
            errors.push(ValidationError::UnknownDefault(default.clone()));
        }
    }

    if let SelectorConfig::Priority { order } = &config.selector {
        if order.is_empty() {
            errors.push(ValidationError::EmptyPriorityList);
        }
        // Providers may also be initialized programmatically, so only check
        // priority names when the config declares providers itself.
        if !config.providers.is_empty() {
            for name in order {
                if !names.contains(name.as_str()) {
                    errors.push(ValidationError::UnknownPriorityProvider(name.clone()));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_resilience(provider: &str, config: &ResilienceConfig, errors: &mut Vec<ValidationError>) {
    let mut invalid = |field: &'static str, reason: &'static str| {
        errors.push(ValidationError::InvalidValue {
            provider: provider.to_string(),
            field,
            reason,
        });
    };

    if let Some(cb) = &config.circuit_breaker {
        if cb.max_failures == 0 {
            invalid("circuit_breaker.max_failures", "must be greater than 0");
        }
        if cb.half_open_max_requests == 0 {
            invalid("circuit_breaker.half_open_max_requests", "must be greater than 0");
        }
    }

    if let Some(retry) = &config.retry {
        if retry.max_attempts == 0 {
            invalid("retry.max_attempts", "must be greater than 0");
        }
        if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
            invalid("retry.backoff_factor", "must be a finite number >= 1.0");
        }
        if retry.max_backoff_ms < retry.initial_backoff_ms {
            invalid("retry.max_backoff_ms", "must not be less than initial_backoff_ms");
        }
    }

    if let Some(rl) = &config.rate_limiter {
        if !rl.rate.is_finite() || rl.rate <= 0.0 {
            invalid("rate_limiter.rate", "must be a positive number");
        }
        if rl.burst == 0 {
            invalid("rate_limiter.burst", "must be greater than 0");
        }
    }

    if let Some(bh) = &config.bulkhead {
        if bh.max_concurrent == 0 {
            invalid("bulkhead.max_concurrent", "must be greater than 0");
        }
    }
}
