//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → command-line / environment overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to the server, which builds breaker and retry policy from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server starts
//! - All fields have defaults carrying the reference behaviour
//! - Validation separates syntactic (serde/clap) from semantic checks

pub mod schema;
pub mod validation;

pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::UpstreamConfig;
pub use schema::CircuitBreakerConfig;
pub use schema::RetryConfig;
pub use schema::TimeoutConfig;
pub use schema::ObservabilityConfig;
pub use validation::{validate_config, ValidationError};
