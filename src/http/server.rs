//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Own the shared breaker and retry policy
//! - Bind server to listener and shut down gracefully

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, RetryConfig};
use crate::http::handlers;
use crate::http::request::request_id_header;
use crate::lifecycle::shutdown::shutdown_signal;
use crate::resilience::{CircuitBreaker, RetryPolicy, SharedSink, TelemetrySink};
use crate::upstream::{HttpUpstream, UpstreamCaller};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamCaller>,
    pub breaker: Arc<CircuitBreaker>,
    pub retry_policy: Arc<RetryPolicy>,
    pub retry_config: RetryConfig,
}

/// The client-facing gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    breaker: Arc<CircuitBreaker>,
}

impl GatewayServer {
    /// Create a gateway calling the configured HTTP upstream, reporting to logs and metrics.
    pub fn new(config: GatewayConfig) -> Self {
        let upstream = Arc::new(HttpUpstream::new(&config.upstream));
        Self::with_upstream(config, upstream, Arc::new(TelemetrySink))
    }

    /// Create a gateway with a custom upstream caller and event sink.
    pub fn with_upstream(
        config: GatewayConfig,
        upstream: Arc<dyn UpstreamCaller>,
        sink: SharedSink,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(&config.circuit_breaker, sink.clone()));
        let retry_policy = Arc::new(RetryPolicy::new(&config.retries, sink));

        let state = AppState {
            upstream,
            breaker: breaker.clone(),
            retry_policy,
            retry_config: config.retries.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            breaker,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let x_request_id = request_id_header();

        Router::new()
            .route("/", get(handlers::root))
            .route("/status", get(handlers::status))
            .route("/circuit", get(handlers::circuit))
            .route("/retries", get(handlers::retries))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until Ctrl+C or a message on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "Gateway server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }

    /// The breaker shared by all `/circuit` requests.
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        self.breaker.clone()
    }
}
