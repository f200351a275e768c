//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: testing if upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first call after reset_timeout
//! Half-Open → Closed: consecutive successes >= success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Concurrency
//! All state sits behind one mutex. A call takes it twice: once to be
//! admitted, once to record its outcome. The upstream call itself runs
//! unlocked. Every transition bumps an epoch; an outcome recorded under a
//! different epoch than it was admitted in is reported but does not move the
//! state machine, so concurrent failures open the circuit exactly once.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::resilience::events::{ResilienceEvent, SharedSink};
use crate::resilience::retries::Retryable;
use crate::upstream::{CallOutcome, FailureKind, UpstreamCaller, UpstreamResponse};

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a guarded call did not return a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// Rejected without contacting the upstream.
    #[error("circuit breaker is open")]
    Open,

    /// The upstream was called and the call failed.
    #[error(transparent)]
    UpstreamFailed(#[from] FailureKind),
}

impl Retryable for BreakerError {
    fn is_retryable(&self) -> bool {
        matches!(self, BreakerError::UpstreamFailed(_))
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Time left before a trial call is admitted, while open.
    pub remaining_cooldown_ms: Option<u64>,
}

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    epoch: u64,
}

impl BreakerCore {
    fn transition(&mut self, to: CircuitState, events: &mut Vec<ResilienceEvent>) {
        let from = self.state;
        self.state = to;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        self.opened_at = (to == CircuitState::Open).then(Instant::now);
        self.epoch += 1;
        events.push(ResilienceEvent::StateChanged { from, to });
    }
}

/// Three-state circuit breaker shared by every request for one upstream.
pub struct CircuitBreaker {
    failure_threshold: u32,
    success_threshold: u32,
    reset_timeout: Duration,
    core: Mutex<BreakerCore>,
    sink: SharedSink,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: &CircuitBreakerConfig, sink: SharedSink) -> Self {
        tracing::info!(
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            reset_timeout_ms = config.reset_timeout_ms,
            "Circuit breaker created"
        );

        Self {
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            reset_timeout: config.reset_timeout(),
            core: Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                epoch: 0,
            }),
            sink,
        }
    }

    /// Current state as last recorded. An open breaker whose cooldown has
    /// elapsed still reports `Open` until the next call arrives.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        let remaining_cooldown_ms = match (core.state, core.opened_at) {
            (CircuitState::Open, Some(opened_at)) => {
                let left = self.reset_timeout.saturating_sub(opened_at.elapsed());
                Some(u64::try_from(left.as_millis()).unwrap_or(u64::MAX))
            }
            _ => None,
        };
        BreakerSnapshot {
            state: core.state,
            consecutive_failures: core.consecutive_failures,
            consecutive_successes: core.consecutive_successes,
            remaining_cooldown_ms,
        }
    }

    /// Call `path` on `upstream` at most once, through the breaker.
    pub async fn guarded_call(
        &self,
        upstream: &dyn UpstreamCaller,
        path: &str,
    ) -> Result<UpstreamResponse, BreakerError> {
        self.call(|| upstream.call(path)).await
    }

    /// Run `op` through the breaker. `op` is not invoked when the call is rejected.
    pub async fn call<F, Fut>(&self, op: F) -> Result<UpstreamResponse, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CallOutcome>,
    {
        let epoch = self.admit()?;
        let outcome = op().await;
        self.record(epoch, outcome)
    }

    fn admit(&self) -> Result<u64, BreakerError> {
        let mut events = Vec::new();
        let admitted = {
            let mut core = self.lock();
            match core.state {
                CircuitState::Open => {
                    let cooled = core
                        .opened_at
                        .map_or(true, |opened_at| opened_at.elapsed() >= self.reset_timeout);
                    if cooled {
                        core.transition(CircuitState::HalfOpen, &mut events);
                        Ok(core.epoch)
                    } else {
                        events.push(ResilienceEvent::CallRejected { state: core.state });
                        Err(BreakerError::Open)
                    }
                }
                CircuitState::Closed | CircuitState::HalfOpen => Ok(core.epoch),
            }
        };
        self.emit(events);
        admitted
    }

    fn record(&self, epoch: u64, outcome: CallOutcome) -> Result<UpstreamResponse, BreakerError> {
        let mut events = Vec::new();
        {
            let mut core = self.lock();
            let current = core.epoch == epoch;
            match (&outcome, core.state) {
                (CallOutcome::Success(_), CircuitState::Closed) if current => {
                    core.consecutive_failures = 0;
                }
                (CallOutcome::Success(_), CircuitState::HalfOpen) if current => {
                    core.consecutive_successes += 1;
                    if core.consecutive_successes >= self.success_threshold {
                        core.transition(CircuitState::Closed, &mut events);
                    }
                }
                (CallOutcome::Failure(_), CircuitState::Closed) if current => {
                    core.consecutive_failures += 1;
                    if core.consecutive_failures >= self.failure_threshold {
                        core.transition(CircuitState::Open, &mut events);
                    }
                }
                (CallOutcome::Failure(_), CircuitState::HalfOpen) if current => {
                    core.transition(CircuitState::Open, &mut events);
                }
                _ => {
                    tracing::debug!(
                        admitted_epoch = epoch,
                        current_epoch = core.epoch,
                        state = %core.state,
                        "Ignoring stale outcome"
                    );
                }
            }

            let state = core.state;
            events.push(match &outcome {
                CallOutcome::Success(_) => ResilienceEvent::CallSucceeded { state },
                CallOutcome::Failure(reason) => ResilienceEvent::CallFailed {
                    state,
                    reason: reason.clone(),
                },
            });
        }
        self.emit(events);
        outcome.into_result().map_err(BreakerError::UpstreamFailed)
    }

    fn emit(&self, events: Vec<ResilienceEvent>) {
        for event in &events {
            self.sink.notify(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
