//! Resilient gateway library: circuit breaker and retry-with-backoff guarding
//! calls to an unreliable upstream.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
