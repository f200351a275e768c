//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! /circuit request:
//!     → circuit_breaker.rs (admit or fail fast, one upstream call, record outcome)
//!
//! /retries request:
//!     → retries.rs (attempt loop)
//!         → backoff.rs (min(max, base * 2^i) + jitter between attempts)
//!
//! Both:
//!     → timeouts.rs (every upstream call has a deadline)
//!     → events.rs (transitions and outcomes to the sink)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - The breaker and the retry policy are independent and guard separate
//!   endpoints; when composed, retries wrap the breaker and an open circuit
//!   stops the retry loop

pub mod backoff;
pub mod circuit_breaker;
pub mod events;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use events::{ChannelSink, EventSink, FanoutSink, ResilienceEvent, SharedSink, TelemetrySink};
pub use retries::{RetryExhausted, RetryPolicy, RetrySuccess, Retryable};
