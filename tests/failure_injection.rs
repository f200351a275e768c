//! Failure injection tests for the gateway.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use resilient_gateway::resilience::CircuitState;
use resilient_gateway::upstream::flaky::FlakyConfig;
use serde_json::{json, Value};

mod common;

/// Upstream failing the first `failures` calls, then answering 200.
async fn recovering_backend(failures: u32) -> (std::net::SocketAddr, Arc<AtomicU32>) {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let addr = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            let count = cc.fetch_add(1, Ordering::SeqCst);
            if count < failures {
                (500, r#"{"message":"Failed"}"#.into())
            } else {
                (200, r#"{"message":"Hello"}"#.into())
            }
        }
    })
    .await;
    (addr, call_count)
}

#[tokio::test]
async fn test_circuit_opens_against_failing_upstream() {
    let upstream = common::start_flaky_upstream(FlakyConfig::uniform(1.0)).await;
    let mut config = common::test_config(upstream);
    config.circuit_breaker.reset_timeout_ms = 60_000;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(gateway.url("/circuit")).send().await.expect("Gateway unreachable");
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["breaker_state"], "closed");
    assert_eq!(body["error"], "upstream returned HTTP 500");

    let res = client.get(gateway.url("/circuit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["breaker_state"], "open");

    for _ in 0..3 {
        let res = client.get(gateway.url("/circuit")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = res.json().await.unwrap();
        assert_eq!(
            body,
            json!({"error": "Circuit breaker open", "breaker_state": "open", "backend_path": "/circuit"})
        );
    }
    assert_eq!(gateway.breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn test_chaos_mode_uses_stable_path() {
    let upstream = common::start_flaky_upstream(FlakyConfig::uniform(1.0)).await;
    let gateway = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client.get(gateway.url("/circuit?mode=chaos")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(
            body,
            json!({
                "status": "success",
                "breaker_state": "closed",
                "backend_path": "/chaos",
                "response": {"message": "Hello"}
            })
        );
    }
}

#[tokio::test]
async fn test_circuit_recovers_after_cooldown() {
    let (upstream, call_count) = recovering_backend(2).await;
    let mut config = common::test_config(upstream);
    config.circuit_breaker.reset_timeout_ms = 300;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..2 {
        let res = client.get(gateway.url("/circuit")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
    let res = client.get(gateway.url("/circuit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(call_count.load(Ordering::SeqCst), 2, "Fast fail must not reach the upstream");

    tokio::time::sleep(Duration::from_millis(400)).await;

    let res = client.get(gateway.url("/circuit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["breaker_state"], "half_open");

    let res = client.get(gateway.url("/circuit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["breaker_state"], "closed");

    let status: Value = client
        .get(gateway.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["breaker"]["state"], "closed");
    assert_eq!(status["breaker"]["consecutive_failures"], 0);
    assert_eq!(status["breaker"]["consecutive_successes"], 0);
}

#[tokio::test]
async fn test_retry_on_failure() {
    let (upstream, call_count) = recovering_backend(2).await;
    let gateway = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();

    let res = client.get(gateway.url("/retries")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "Should eventually succeed after retries");
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["status"], "success");
    assert_eq!(body["attempts"], 3);
    assert_eq!(body["delays"].as_array().unwrap().len(), 2);
    assert_eq!(body["response"], json!({"message": "Hello"}));
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retries_report_delays_on_exhaustion() {
    let upstream = common::start_flaky_upstream(FlakyConfig::uniform(1.0)).await;
    let mut config = common::test_config(upstream);
    config.retries.max_attempts = 4;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(gateway.url("/retries")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["status"], "failed");
    assert_eq!(body["attempts"], 4);
    assert_eq!(body["error"], "upstream returned HTTP 500");
    assert!(body.get("response").is_none());

    let delays: Vec<f64> = body["delays"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_f64().unwrap())
        .collect();
    assert_eq!(delays.len(), 3);
    // floors 10ms, 20ms, 40ms plus up to 5ms jitter, rounded to centiseconds
    let floors = [0.01, 0.02, 0.04];
    for (delay, floor) in delays.iter().zip(floors) {
        assert!(
            *delay >= floor && *delay <= floor + 0.01,
            "delay {delay} outside [{floor}, {floor}+0.01]"
        );
    }
    assert!(body["time_taken"].as_f64().unwrap() >= 0.07);
}

#[tokio::test]
async fn test_upstream_timeout_counts_as_failure() {
    let upstream = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, r#"{"message":"Hello"}"#.into())
    })
    .await;
    let mut config = common::test_config(upstream);
    config.upstream.timeout_ms = 100;
    config.circuit_breaker.failure_threshold = 1;
    config.circuit_breaker.reset_timeout_ms = 60_000;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(gateway.url("/circuit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "upstream call timed out");
    assert_eq!(body["breaker_state"], "open");
}

#[tokio::test]
async fn test_unreachable_upstream_is_transport_error() {
    let upstream = common::closed_port().await;
    let mut config = common::test_config(upstream);
    config.retries.max_attempts = 2;
    let gateway = common::start_gateway(config).await;
    let client = common::client();

    let res = client.get(gateway.url("/circuit")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("transport error"));

    let res = client.get(gateway.url("/retries")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["attempts"], 2);
}

#[tokio::test]
async fn test_request_id_is_set_and_propagated() {
    let upstream = common::start_flaky_upstream(FlakyConfig::uniform(0.0)).await;
    let gateway = common::start_gateway(common::test_config(upstream)).await;
    let client = common::client();

    let res = client.get(gateway.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let generated = res.headers().get("x-request-id").expect("request id generated");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());

    let res = client
        .get(gateway.url("/circuit"))
        .header("x-request-id", "load-test-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-request-id").unwrap(), "load-test-42");
}
