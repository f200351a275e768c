//! Resilient gateway (client-facing service).
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                 RESILIENT GATEWAY                 │
//!   GET /circuit?mode=     │  ┌────────┐    ┌────────────────┐                 │
//!   ───────────────────────┼─▶│  http  │───▶│ circuit breaker│──┐              │
//!                          │  │handlers│    └────────────────┘  │  ┌─────────┐ │
//!   GET /retries?mode=     │  │        │    ┌────────────────┐  ├─▶│upstream │─┼──▶ Flaky
//!   ───────────────────────┼─▶│        │───▶│  retry policy  │──┘  │ caller  │ │    upstream
//!                          │  └────────┘    └────────────────┘     └─────────┘ │
//!                          │                        │                          │
//!                          │                        ▼                          │
//!                          │            events → logs + metrics                │
//!                          └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use resilient_gateway::config::{validate_config, GatewayConfig};
use resilient_gateway::observability::{logging, metrics};
use resilient_gateway::{GatewayServer, Shutdown};

/// Overrides on top of the built-in defaults. Unset flags keep the default.
#[derive(Parser, Debug, Default)]
#[command(name = "resilient-gateway")]
#[command(
    about = "Circuit breaker and retry demo gateway in front of a flaky upstream",
    long_about = None
)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "GATEWAY_BIND")]
    bind: Option<String>,

    /// Upstream base URL
    #[arg(long, env = "UPSTREAM_URL")]
    upstream_url: Option<String>,

    /// Per-call upstream timeout in milliseconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS")]
    upstream_timeout_ms: Option<u64>,

    /// Consecutive failures that open the circuit
    #[arg(long, env = "BREAKER_FAILURE_THRESHOLD")]
    failure_threshold: Option<u32>,

    /// Consecutive half-open successes that close the circuit
    #[arg(long, env = "BREAKER_SUCCESS_THRESHOLD")]
    success_threshold: Option<u32>,

    /// Open-state cooldown in milliseconds
    #[arg(long, env = "BREAKER_RESET_TIMEOUT_MS")]
    reset_timeout_ms: Option<u64>,

    /// Attempts per retrying call
    #[arg(long, env = "RETRY_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    /// Backoff base delay in milliseconds
    #[arg(long, env = "RETRY_BASE_DELAY_MS")]
    base_delay_ms: Option<u64>,

    /// Backoff cap in milliseconds
    #[arg(long, env = "RETRY_MAX_DELAY_MS")]
    max_delay_ms: Option<u64>,

    /// Jitter upper bound in milliseconds
    #[arg(long, env = "RETRY_JITTER_MS")]
    jitter_ms: Option<u64>,

    /// Inbound request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Expose Prometheus metrics on this address
    #[arg(long, env = "METRICS_ADDRESS")]
    metrics_address: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(v) = self.bind {
            config.listener.bind_address = v;
        }
        if let Some(v) = self.upstream_url {
            config.upstream.base_url = v;
        }
        if let Some(v) = self.upstream_timeout_ms {
            config.upstream.timeout_ms = v;
        }
        if let Some(v) = self.failure_threshold {
            config.circuit_breaker.failure_threshold = v;
        }
        if let Some(v) = self.success_threshold {
            config.circuit_breaker.success_threshold = v;
        }
        if let Some(v) = self.reset_timeout_ms {
            config.circuit_breaker.reset_timeout_ms = v;
        }
        if let Some(v) = self.max_attempts {
            config.retries.max_attempts = v;
        }
        if let Some(v) = self.base_delay_ms {
            config.retries.base_delay_ms = v;
        }
        if let Some(v) = self.max_delay_ms {
            config.retries.max_delay_ms = v;
        }
        if let Some(v) = self.jitter_ms {
            config.retries.jitter_ms = v;
        }
        if let Some(v) = self.request_timeout_secs {
            config.timeouts.request_secs = v;
        }
        if let Some(v) = self.log_level {
            config.observability.log_level = v;
        }
        if let Some(v) = self.metrics_address {
            config.observability.metrics_enabled = true;
            config.observability.metrics_address = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut config = GatewayConfig::default();
    Cli::parse().apply(&mut config);

    logging::init_logging(&config.observability.log_level);

    tracing::info!("resilient-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(%error, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        failure_threshold = config.circuit_breaker.failure_threshold,
        reset_timeout_ms = config.circuit_breaker.reset_timeout_ms,
        max_attempts = config.retries.max_attempts,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
