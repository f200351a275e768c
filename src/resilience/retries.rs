//! Retry logic.
//!
//! # Responsibilities
//! - Execute retries with exponential backoff + jitter
//! - Record every scheduled delay for the caller
//! - Stop on success, on a non-retryable error, or after `max_attempts`
//!
//! # Design Decisions
//! - The policy holds configuration only; attempt index and recorded delays
//!   live inside one `execute` call, so one policy serves concurrent requests
//! - A delay is recorded and reported before the sleep starts
//! - Jittered backoff prevents thundering herd

use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::events::{ResilienceEvent, SharedSink};
use crate::upstream::{FailureKind, UpstreamCaller, UpstreamResponse};

/// Errors that may be worth another attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FailureKind {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// A retrying call that ended in success.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySuccess<T> {
    pub value: T,
    /// Attempts made, the successful one included.
    pub attempts: u32,
    /// Waits scheduled between attempts, `attempts - 1` of them.
    pub delays: Vec<Duration>,
}

/// A retrying call that gave up, with its full history.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{last_error} (after {attempts} attempt(s))")]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
    pub delays: Vec<Duration>,
}

/// Bounded retry with exponential backoff and additive jitter.
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
    sink: SharedSink,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, sink: SharedSink) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            jitter: config.jitter(),
            sink,
        }
    }

    /// Call `path` on `upstream` until it succeeds or attempts run out.
    pub async fn retrying_call(
        &self,
        upstream: &dyn UpstreamCaller,
        path: &str,
    ) -> Result<RetrySuccess<UpstreamResponse>, RetryExhausted<FailureKind>> {
        self.execute(|| async move {
            tracing::info!(path, "Attempting upstream call");
            upstream.call(path).await.into_result()
        })
        .await
    }

    /// Run `op` until it returns `Ok`, returns a non-retryable error, or has
    /// been invoked `max_attempts` times.
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut op: F,
    ) -> Result<RetrySuccess<T>, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut delays = Vec::new();
        let mut attempt_index: u32 = 0;

        loop {
            let attempts = attempt_index + 1;
            match op().await {
                Ok(value) => {
                    self.sink.notify(&ResilienceEvent::RetrySucceeded {
                        attempts,
                        delays: delays.clone(),
                    });
                    return Ok(RetrySuccess { value, attempts, delays });
                }
                Err(err) if err.is_retryable() && attempts < self.max_attempts => {
                    let delay = calculate_backoff(
                        attempt_index,
                        self.base_delay,
                        self.max_delay,
                        self.jitter,
                    );
                    delays.push(delay);
                    self.sink.notify(&ResilienceEvent::RetryScheduled {
                        attempt: attempts,
                        delay,
                        reason: err.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    attempt_index += 1;
                }
                Err(err) => {
                    self.sink.notify(&ResilienceEvent::RetryExhausted {
                        attempts,
                        delays: delays.clone(),
                        reason: err.to_string(),
                    });
                    return Err(RetryExhausted { attempts, last_error: err, delays });
                }
            }
        }
    }
}
