use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Classification of a failed exchange with the GitHub API.
///
/// `RateLimited` is split out of `Forbidden` so callers can back off
/// instead of treating the failure as a permanent denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    Unauthorized,
    RateLimited,
    Forbidden,
    NotFound,
    InvalidRequest,
    ParseFailure,
    Unknown,
}

/// Structured form of any failure crossing the network boundary.
///
/// Constructed once where the raw failure is first observed and
/// propagated by value; never mutated afterwards.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub method: Option<String>,
    pub path: Option<String>,
    /// Raw response body when it parsed as JSON, for operator diagnosis.
    pub body: Option<Value>,
}

impl ApiError {
    /// Transport never produced a response (connect failure, timeout).
    pub fn network(context: &str, detail: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Unknown,
            message: format!("Network error while {}: {}", context, detail),
            status: None,
            method: None,
            path: None,
            body: None,
        }
    }

    /// A 2xx body that did not match the operation's declared shape.
    pub fn parse_failure(
        context: &str,
        detail: impl std::fmt::Display,
        status: u16,
        method: Option<String>,
        path: Option<String>,
    ) -> Self {
        Self {
            kind: ApiErrorKind::ParseFailure,
            message: format!("Failed to parse GitHub API response while {}: {}", context, detail),
            status: Some(status),
            method,
            path,
            body: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_carry_context_and_no_status() {
        let err = ApiError::network("creating an issue", "connection refused");
        assert_eq!(err.kind, ApiErrorKind::Unknown);
        assert!(err.message.contains("creating an issue"));
        assert!(err.message.contains("connection refused"));
        assert_eq!(err.status, None);
    }

    #[test]
    fn parse_failures_keep_the_origin_request() {
        let err = ApiError::parse_failure(
            "listing commits",
            "missing field `sha`",
            200,
            Some("GET".to_string()),
            Some("/repos/a/b/commits".to_string()),
        );
        assert_eq!(err.kind, ApiErrorKind::ParseFailure);
        assert_eq!(err.status, Some(200));
        assert_eq!(err.method.as_deref(), Some("GET"));
        assert!(err.message.contains("listing commits"));
    }
}
