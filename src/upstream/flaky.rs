//! Unreliable upstream service.
//!
//! Serves `/circuit`, `/retries` and `/chaos`. The first two fail with a
//! configured probability, `/chaos` never fails. Used by the `flaky-upstream`
//! binary and by integration tests.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;

/// Failure probabilities per path, each in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct FlakyConfig {
    pub circuit_failure_rate: f64,
    pub retries_failure_rate: f64,
}

impl FlakyConfig {
    /// Same probability on both flaky paths.
    pub fn uniform(rate: f64) -> Self {
        Self {
            circuit_failure_rate: rate,
            retries_failure_rate: rate,
        }
    }
}

impl Default for FlakyConfig {
    fn default() -> Self {
        // 5 and 6 out of 11 draws fail
        Self {
            circuit_failure_rate: 5.0 / 11.0,
            retries_failure_rate: 6.0 / 11.0,
        }
    }
}

/// Build the upstream router.
pub fn flaky_router(config: FlakyConfig) -> Router {
    Router::new()
        .route("/circuit", get(circuit))
        .route("/retries", get(retries))
        .route("/chaos", get(chaos))
        .with_state(Arc::new(config))
}

async fn circuit(State(config): State<Arc<FlakyConfig>>) -> (StatusCode, Json<Value>) {
    respond("/circuit", config.circuit_failure_rate)
}

async fn retries(State(config): State<Arc<FlakyConfig>>) -> (StatusCode, Json<Value>) {
    respond("/retries", config.retries_failure_rate)
}

async fn chaos() -> (StatusCode, Json<Value>) {
    tracing::info!(path = "/chaos", "Serving stable path");
    (StatusCode::OK, Json(json!({"message": "Hello"})))
}

fn respond(path: &'static str, failure_rate: f64) -> (StatusCode, Json<Value>) {
    if rand::thread_rng().gen_bool(probability(failure_rate)) {
        tracing::warn!(path, "Injecting failure");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "Failed"})))
    } else {
        tracing::debug!(path, "Serving success");
        (StatusCode::OK, Json(json!({"message": "Hello"})))
    }
}

fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_is_clamped() {
        assert_eq!(probability(-1.0), 0.0);
        assert_eq!(probability(3.0), 1.0);
        assert_eq!(probability(f64::NAN), 0.0);
        assert_eq!(probability(0.25), 0.25);
    }

    #[test]
    fn test_extreme_rates_are_deterministic() {
        for _ in 0..50 {
            assert_eq!(respond("/circuit", 1.0).0, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(respond("/circuit", 0.0).0, StatusCode::OK);
        }
    }
}
