//! Upstream caller.
//!
//! # Responsibilities
//! - Perform exactly one GET against the upstream per invocation
//! - Enforce the per-call timeout over headers and body
//! - Classify the result into a [`CallOutcome`]
//!
//! # Design Decisions
//! - The caller never retries and never trips anything; it only classifies
//! - Object safe so the server can hold any implementation behind `Arc<dyn _>`

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::resilience::timeouts::with_deadline;
use crate::upstream::outcome::{classify, CallOutcome, FailureKind, UpstreamResponse};

/// Largest upstream body the gateway will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// One network call to the upstream, classified.
#[async_trait]
pub trait UpstreamCaller: Send + Sync {
    /// Call `path` on the upstream once.
    async fn call(&self, path: &str) -> CallOutcome;
}

/// HTTP implementation backed by the hyper-util pooled client.
#[derive(Clone)]
pub struct HttpUpstream {
    base_url: String,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .build(HttpConnector::new());

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            client,
        }
    }

    async fn exchange(&self, uri: String) -> Result<UpstreamResponse, FailureKind> {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::USER_AGENT, "resilient-gateway")
            .body(Body::empty())
            .map_err(|e| FailureKind::Transport(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| FailureKind::Transport(e.to_string()))?;

        let (parts, body) = response.into_parts();
        read_body(parts.status.as_u16(), body).await
    }
}

async fn read_body(status: u16, body: Incoming) -> Result<UpstreamResponse, FailureKind> {
    let bytes = axum::body::to_bytes(Body::new(body), MAX_BODY_BYTES)
        .await
        .map_err(|e| FailureKind::Transport(e.to_string()))?;

    Ok(UpstreamResponse::from_bytes(status, &bytes))
}

#[async_trait]
impl UpstreamCaller for HttpUpstream {
    async fn call(&self, path: &str) -> CallOutcome {
        let uri = format!("{}{}", self.base_url, path);
        tracing::debug!(uri = %uri, "Calling upstream");

        match with_deadline(self.timeout, self.exchange(uri.clone())).await {
            Ok(response) => {
                tracing::debug!(uri = %uri, status = response.status, "Upstream responded");
                let outcome = classify(response);
                if let CallOutcome::Failure(kind) = &outcome {
                    tracing::error!(
                        uri = %uri,
                        reason = %kind,
                        "Upstream server error (treated as failure)"
                    );
                }
                outcome
            }
            Err(kind) => {
                tracing::error!(uri = %uri, reason = %kind, "Upstream call failed");
                CallOutcome::Failure(kind)
            }
        }
    }
}
