//! Endpoint handlers.
//!
//! Thin pass-through: pick the upstream path, hand the call to the breaker or
//! the retry policy, map the outcome to a response.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Instant;

use crate::http::request::ModeQuery;
use crate::http::response::{
    breaker_error_status, round_secs, rounded_delays, CircuitFailure, CircuitSuccess, RetryReport,
    StatusReport,
};
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn root() -> impl IntoResponse {
    Json(json!({"message": "Hello"}))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        breaker: state.breaker.snapshot(),
        retries: state.retry_config.clone(),
    })
}

/// `GET /circuit`: one upstream call through the shared breaker.
pub async fn circuit(State(state): State<AppState>, Query(query): Query<ModeQuery>) -> Response {
    let start = Instant::now();
    let path = query.upstream_path("/circuit");

    tracing::info!(
        state = %state.breaker.state(),
        mode = %query.label(),
        path,
        "Circuit endpoint called"
    );

    let result = state.breaker.guarded_call(state.upstream.as_ref(), path).await;
    let breaker_state = state.breaker.state();

    let response = match result {
        Ok(upstream) => {
            tracing::info!(
                state = %breaker_state,
                status = upstream.status,
                "Circuit call success"
            );
            (
                StatusCode::OK,
                Json(CircuitSuccess {
                    status: "success",
                    breaker_state,
                    backend_path: path,
                    response: upstream.body,
                }),
            )
                .into_response()
        }
        Err(err) => {
            let status = breaker_error_status(&err);
            tracing::error!(
                state = %breaker_state,
                error = %err,
                status = status.as_u16(),
                "Circuit call rejected or failed"
            );
            (status, Json(CircuitFailure::new(&err, breaker_state, path))).into_response()
        }
    };

    metrics::record_request("circuit", response.status().as_u16(), start);
    response
}

/// `GET /retries`: retry loop with backoff against the upstream.
pub async fn retries(State(state): State<AppState>, Query(query): Query<ModeQuery>) -> Response {
    let start = Instant::now();
    let path = query.upstream_path("/retries");

    tracing::info!(mode = %query.label(), path, "Retries endpoint called");

    let response = match state.retry_policy.retrying_call(state.upstream.as_ref(), path).await {
        Ok(success) => {
            let elapsed = start.elapsed();
            tracing::info!(
                elapsed_secs = elapsed.as_secs_f64(),
                attempts = success.attempts,
                delays = ?success.delays,
                "Retry success"
            );
            (
                StatusCode::OK,
                Json(RetryReport {
                    status: "success",
                    error: None,
                    time_taken: round_secs(elapsed),
                    attempts: success.attempts,
                    delays: rounded_delays(&success.delays),
                    response: Some(success.value.body),
                }),
            )
                .into_response()
        }
        Err(exhausted) => {
            let elapsed = start.elapsed();
            tracing::error!(
                elapsed_secs = elapsed.as_secs_f64(),
                error = %exhausted,
                delays = ?exhausted.delays,
                "Retry failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RetryReport {
                    status: "failed",
                    error: Some(exhausted.last_error.to_string()),
                    time_taken: round_secs(elapsed),
                    attempts: exhausted.attempts,
                    delays: rounded_delays(&exhausted.delays),
                    response: None,
                }),
            )
                .into_response()
        }
    };

    metrics::record_request("retries", response.status().as_u16(), start);
    response
}
