//! Resilience events and the sinks that receive them.
//!
//! The breaker and the retry policy report every state transition and every
//! terminal outcome as a [`ResilienceEvent`]. A sink is anything implementing
//! [`EventSink`]: closures qualify, [`ChannelSink`] forwards to a channel and
//! [`TelemetrySink`] turns events into logs and metrics.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::resilience::CircuitState;
use crate::upstream::FailureKind;

/// Something the resilience layer wants the outside world to know.
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceEvent {
    /// The breaker moved from one state to another.
    StateChanged { from: CircuitState, to: CircuitState },
    /// A guarded call succeeded.
    CallSucceeded { state: CircuitState },
    /// A guarded call reached the upstream and failed.
    CallFailed { state: CircuitState, reason: FailureKind },
    /// A guarded call was rejected without reaching the upstream.
    CallRejected { state: CircuitState },
    /// A retry was scheduled after attempt `attempt` (1-based) failed.
    RetryScheduled { attempt: u32, delay: Duration, reason: String },
    /// A retrying call succeeded.
    RetrySucceeded { attempts: u32, delays: Vec<Duration> },
    /// A retrying call gave up.
    RetryExhausted { attempts: u32, delays: Vec<Duration>, reason: String },
}

/// Passive listener for resilience events.
///
/// Called synchronously from the request path; keep it cheap.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: &ResilienceEvent);
}

impl<F> EventSink for F
where
    F: Fn(&ResilienceEvent) + Send + Sync,
{
    fn notify(&self, event: &ResilienceEvent) {
        self(event)
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Delivers events to several sinks in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn notify(&self, event: &ResilienceEvent) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}

/// Forwards events into an unbounded channel. Dropped receivers are ignored.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ResilienceEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResilienceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn notify(&self, event: &ResilienceEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Default sink: structured logs plus metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetrySink;

impl EventSink for TelemetrySink {
    fn notify(&self, event: &ResilienceEvent) {
        match event {
            ResilienceEvent::StateChanged { from, to } => {
                tracing::warn!(from = %from, to = %to, "Circuit state change");
                metrics::record_breaker_transition(*from, *to);
            }
            ResilienceEvent::CallSucceeded { state } => {
                tracing::info!(state = %state, "Circuit call succeeded");
                metrics::record_breaker_call("success");
            }
            ResilienceEvent::CallFailed { state, reason } => {
                tracing::error!(state = %state, reason = %reason, "Circuit call failed");
                metrics::record_breaker_call("failure");
            }
            ResilienceEvent::CallRejected { state } => {
                tracing::error!(state = %state, "Circuit breaker open, fast fail");
                metrics::record_breaker_call("rejected");
            }
            ResilienceEvent::RetryScheduled { attempt, delay, reason } => {
                tracing::warn!(
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    reason = %reason,
                    "Retry scheduled"
                );
            }
            ResilienceEvent::RetrySucceeded { attempts, delays } => {
                tracing::info!(attempts, delays = ?delays, "Retrying call succeeded");
                metrics::record_retry_attempts(*attempts);
                metrics::record_retry_call("success");
            }
            ResilienceEvent::RetryExhausted { attempts, delays, reason } => {
                tracing::error!(
                    attempts,
                    delays = ?delays,
                    reason = %reason,
                    "Retrying call exhausted"
                );
                metrics::record_retry_attempts(*attempts);
                metrics::record_retry_call("exhausted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_and_fanout_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let seen = seen.clone();
            move |event: &ResilienceEvent| seen.lock().unwrap().push(event.clone())
        };

        let sink = FanoutSink::new()
            .with(Arc::new(TelemetrySink))
            .with(Arc::new(recorder));

        let event = ResilienceEvent::StateChanged {
            from: CircuitState::Closed,
            to: CircuitState::Open,
        };
        sink.notify(&event);

        assert_eq!(*seen.lock().unwrap(), vec![event]);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::new();
        sink.notify(&ResilienceEvent::CallRejected { state: CircuitState::Open });

        assert_eq!(
            rx.recv().await,
            Some(ResilienceEvent::CallRejected { state: CircuitState::Open })
        );

        drop(rx);
        sink.notify(&ResilienceEvent::CallRejected { state: CircuitState::Open });
    }
}
