//! Request handling.
//!
//! # Responsibilities
//! - Request ID header shared by the set/propagate layers
//! - Parse the `mode` query parameter and pick the upstream path
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Unknown modes fall back to the endpoint's default upstream path

use axum::http::HeaderName;
use serde::Deserialize;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Upstream path that never fails.
pub const CHAOS_PATH: &str = "/chaos";

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// `?mode=` query parameter of the guarded endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

impl ModeQuery {
    pub fn is_chaos(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|mode| mode.eq_ignore_ascii_case("chaos"))
    }

    /// `/chaos` in chaos mode, `default_path` otherwise.
    pub fn upstream_path(&self, default_path: &'static str) -> &'static str {
        if self.is_chaos() {
            CHAOS_PATH
        } else {
            default_path
        }
    }

    /// Mode for logging.
    pub fn label(&self) -> String {
        match self.mode.as_deref() {
            Some(mode) if !mode.is_empty() => mode.to_ascii_lowercase(),
            _ => "default".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(mode: Option<&str>) -> ModeQuery {
        ModeQuery { mode: mode.map(str::to_string) }
    }

    #[test]
    fn test_chaos_mode_selects_chaos_path() {
        assert_eq!(query(Some("chaos")).upstream_path("/circuit"), "/chaos");
        assert_eq!(query(Some("CHAOS")).upstream_path("/retries"), "/chaos");
    }

    #[test]
    fn test_other_modes_use_default_path() {
        assert_eq!(query(None).upstream_path("/circuit"), "/circuit");
        assert_eq!(query(Some("calm")).upstream_path("/retries"), "/retries");
        assert_eq!(query(Some("")).label(), "default");
        assert_eq!(query(None).label(), "default");
    }
}
