//! Response bodies and status mapping.
//!
//! # Responsibilities
//! - JSON bodies for the guarded endpoints
//! - Map resilience outcomes to HTTP status codes
//!
//! # Design Decisions
//! - Fast fail is 503, any failure that reached the upstream is 500
//! - Durations are reported in seconds rounded to two decimals

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::{BreakerError, BreakerSnapshot, CircuitState};

pub fn breaker_error_status(err: &BreakerError) -> StatusCode {
    match err {
        BreakerError::Open => StatusCode::SERVICE_UNAVAILABLE,
        BreakerError::UpstreamFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Seconds with two decimals.
pub fn round_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

pub fn rounded_delays(delays: &[Duration]) -> Vec<f64> {
    delays.iter().copied().map(round_secs).collect()
}

/// `/circuit` success body.
#[derive(Debug, Serialize)]
pub struct CircuitSuccess {
    pub status: &'static str,
    pub breaker_state: CircuitState,
    pub backend_path: &'static str,
    pub response: Value,
}

/// `/circuit` failure body, fast fail included.
#[derive(Debug, Serialize)]
pub struct CircuitFailure {
    pub error: String,
    pub breaker_state: CircuitState,
    pub backend_path: &'static str,
}

impl CircuitFailure {
    pub fn new(
        err: &BreakerError,
        breaker_state: CircuitState,
        backend_path: &'static str,
    ) -> Self {
        let error = match err {
            BreakerError::Open => "Circuit breaker open".to_string(),
            BreakerError::UpstreamFailed(reason) => reason.to_string(),
        };
        Self { error, breaker_state, backend_path }
    }
}

/// `/retries` body for both outcomes.
#[derive(Debug, Serialize)]
pub struct RetryReport {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub time_taken: f64,
    pub attempts: u32,
    pub delays: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// `/status` body.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub breaker: BreakerSnapshot,
    pub retries: RetryConfig,
}
