//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! resilience layer
//!     → caller.rs (one GET, bounded by the call timeout)
//!     → outcome.rs (5xx / timeout / transport → failure, rest → success)
//!     → CallOutcome back to the breaker or retry policy
//! ```
//!
//! `scripted.rs` replaces the network for tests; `flaky.rs` is the
//! unreliable service itself.

pub mod caller;
pub mod flaky;
pub mod outcome;
pub mod scripted;

pub use caller::{HttpUpstream, UpstreamCaller};
pub use outcome::{classify, CallOutcome, FailureKind, UpstreamResponse};
pub use scripted::ScriptedUpstream;
