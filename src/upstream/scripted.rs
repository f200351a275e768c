//! Deterministic stand-in for the upstream.
//!
//! Replays a fixed sequence of outcomes, then keeps returning the fallback.
//! Records every path it was called with.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::upstream::caller::UpstreamCaller;
use crate::upstream::outcome::{CallOutcome, FailureKind, UpstreamResponse};

#[derive(Debug)]
pub struct ScriptedUpstream {
    script: Mutex<VecDeque<CallOutcome>>,
    fallback: CallOutcome,
    calls: Mutex<Vec<String>>,
    latency: Duration,
}

impl ScriptedUpstream {
    /// Replay `script`, then answer with `fallback` forever.
    pub fn new(script: impl IntoIterator<Item = CallOutcome>, fallback: CallOutcome) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Upstream that always answers 200.
    pub fn healthy() -> Self {
        Self::new([], Self::ok())
    }

    /// Upstream that always answers 500.
    pub fn failing() -> Self {
        Self::new([], Self::server_error())
    }

    /// Sleep this long inside every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn ok() -> CallOutcome {
        CallOutcome::Success(UpstreamResponse::new(200, json!({"message": "Hello"})))
    }

    pub fn server_error() -> CallOutcome {
        CallOutcome::Failure(FailureKind::UpstreamError { status: 500 })
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Paths of all calls received so far, in order.
    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl UpstreamCaller for ScriptedUpstream {
    async fn call(&self, path: &str) -> CallOutcome {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
