//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by endpoint, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `breaker_transitions_total` (counter): state changes by from/to
//! - `breaker_calls_total` (counter): guarded calls by outcome
//! - `breaker_state` (gauge): 0=closed, 1=open, 2=half_open
//! - `retry_attempts_total` (counter): upstream attempts made by the retry path
//! - `retry_calls_total` (counter): retrying calls by result
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint listening");
            seed_gauges();
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Gauges get a value before the first scrape; the breaker starts closed.
fn seed_gauges() {
    record_breaker_state(CircuitState::Closed);
}

pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!("gateway_requests_total", "endpoint" => endpoint, "status" => status.to_string())
        .increment(1);
    histogram!("gateway_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_transition(from: CircuitState, to: CircuitState) {
    counter!("breaker_transitions_total", "from" => from.as_str(), "to" => to.as_str())
        .increment(1);
    record_breaker_state(to);
}

pub fn record_breaker_state(state: CircuitState) {
    gauge!("breaker_state").set(f64::from(state as u8));
}

pub fn record_breaker_call(outcome: &'static str) {
    counter!("breaker_calls_total", "outcome" => outcome).increment(1);
}

pub fn record_retry_attempts(attempts: u32) {
    counter!("retry_attempts_total").increment(u64::from(attempts));
}

pub fn record_retry_call(result: &'static str) {
    counter!("retry_calls_total", "result" => result).increment(1);
}
