//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and attempts >= 1, delays ordered)
//! - Check the upstream base URL is an absolute http URI
//! - Check the inbound request timeout outlasts a full `/retries` sequence
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::Uri;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::resilience::backoff::backoff_floor;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be at least 1")]
    ZeroThreshold { field: &'static str },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("retries.base_delay_ms ({base_ms}) exceeds retries.max_delay_ms ({max_ms})")]
    BackoffBounds { base_ms: u64, max_ms: u64 },

    #[error("upstream.base_url {url:?} is not an absolute http URL")]
    InvalidUpstreamUrl { url: String },

    #[error("listener.bind_address {address:?} is not a socket address")]
    InvalidBindAddress { address: String },

    #[error("observability.metrics_address {address:?} is not a socket address")]
    InvalidMetricsAddress { address: String },

    #[error(
        "timeouts.request_secs ({request_secs}s) is shorter than the worst-case \
         retry sequence ({budget_ms}ms)"
    )]
    RequestTimeoutBelowRetryBudget { request_secs: u64, budget_ms: u128 },
}

/// Longest a retrying request can run: every attempt hits the upstream
/// timeout and every wait draws the full jitter.
pub fn worst_case_retry_budget(config: &GatewayConfig) -> Duration {
    let retries = &config.retries;
    let attempts = retries.max_attempts.max(1);
    let waits = attempts - 1;

    let mut budget = config
        .upstream
        .timeout()
        .saturating_mul(attempts)
        .saturating_add(retries.jitter().saturating_mul(waits));

    for index in 0..waits {
        let floor = backoff_floor(index, retries.base_delay(), retries.max_delay());
        if floor >= retries.max_delay() {
            // capped from here on
            budget = budget.saturating_add(floor.saturating_mul(waits - index));
            break;
        }
        budget = budget.saturating_add(floor);
    }

    budget
}

/// Check a configuration before the gateway starts.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: "circuit_breaker.failure_threshold",
        });
    }
    if config.circuit_breaker.success_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: "circuit_breaker.success_threshold",
        });
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: "retries.max_attempts",
        });
    }
    if config.upstream.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "upstream.timeout_ms",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "timeouts.request_secs",
        });
    } else {
        let budget = worst_case_retry_budget(config);
        if Duration::from_secs(config.timeouts.request_secs) < budget {
            errors.push(ValidationError::RequestTimeoutBelowRetryBudget {
                request_secs: config.timeouts.request_secs,
                budget_ms: budget.as_millis(),
            });
        }
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::BackoffBounds {
            base_ms: config.retries.base_delay_ms,
            max_ms: config.retries.max_delay_ms,
        });
    }

    let url_ok = config
        .upstream
        .base_url
        .parse::<Uri>()
        .map(|uri| uri.scheme_str() == Some("http") && uri.authority().is_some())
        .unwrap_or(false);
    if !url_ok {
        errors.push(ValidationError::InvalidUpstreamUrl {
            url: config.upstream.base_url.clone(),
        });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            address: config.listener.bind_address.clone(),
        });
    }

    let metrics = &config.observability;
    if metrics.metrics_enabled && metrics.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress {
            address: metrics.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
