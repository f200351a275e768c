//! Call outcomes and the failure classification rule.
//!
//! A server-error status is a failure even though the transport worked; both
//! resilience layers count failures through [`classify`] and nothing else.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A response the upstream produced for one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Decode a raw body, keeping non-JSON payloads as a JSON string.
    pub fn from_bytes(status: u16, bytes: &[u8]) -> Self {
        let body = serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()));
        Self { status, body }
    }
}

/// Why a single upstream call counts as failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    /// The upstream answered with a 5xx status.
    #[error("upstream returned HTTP {status}")]
    UpstreamError { status: u16 },

    /// No complete response within the call timeout.
    #[error("upstream call timed out")]
    Timeout,

    /// Connection refused, DNS failure, broken body...
    #[error("transport error: {0}")]
    Transport(String),
}

impl FailureKind {
    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::UpstreamError { .. } => "upstream_error",
            FailureKind::Timeout => "timeout",
            FailureKind::Transport(_) => "transport_error",
        }
    }
}

/// Result of one upstream call after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(UpstreamResponse),
    Failure(FailureKind),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<UpstreamResponse, FailureKind> {
        match self {
            CallOutcome::Success(response) => Ok(response),
            CallOutcome::Failure(kind) => Err(kind),
        }
    }
}

/// Apply the classification rule to a response that made it over the wire.
pub fn classify(response: UpstreamResponse) -> CallOutcome {
    if response.status >= 500 {
        CallOutcome::Failure(FailureKind::UpstreamError { status: response.status })
    } else {
        CallOutcome::Success(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_errors_are_failures() {
        for status in [500, 502, 503, 504, 599] {
            let outcome = classify(UpstreamResponse::new(status, json!({"message": "Failed"})));
            assert_eq!(outcome, CallOutcome::Failure(FailureKind::UpstreamError { status }));
        }
    }

    #[test]
    fn test_client_errors_pass_through() {
        let outcome = classify(UpstreamResponse::new(404, json!({"message": "missing"})));
        assert!(outcome.is_success());

        let outcome = classify(UpstreamResponse::new(200, json!({"message": "Hello"})));
        assert_eq!(
            outcome.into_result().unwrap().body,
            json!({"message": "Hello"})
        );
    }

    #[test]
    fn test_non_json_body_is_kept_as_string() {
        let response = UpstreamResponse::from_bytes(200, b"plain text");
        assert_eq!(response.body, Value::String("plain text".into()));

        let response = UpstreamResponse::from_bytes(200, br#"{"message":"Hello"}"#);
        assert_eq!(response.body, json!({"message": "Hello"}));
    }
}
