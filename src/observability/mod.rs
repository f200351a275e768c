//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breaker and retry policy produce ResilienceEvents
//!     → resilience::events::TelemetrySink
//!         → logging.rs (structured log events)
//!         → metrics.rs (counters, gauges, histograms)
//!
//! HTTP layer produces:
//!     → TraceLayer spans, x-request-id on every response
//!     → metrics.rs request counters
//! ```

pub mod logging;
pub mod metrics;
