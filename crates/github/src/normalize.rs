use octogate_core::error::{ApiError, ApiErrorKind};
use serde_json::Value;

/// Wording GitHub uses in 403 bodies when a rate limit is hit. This is an
/// external contract: the substring match mirrors the API's message and
/// must not be "tidied up" into something the API never sends.
const RATE_LIMIT_MARKER: &str = "rate limit exceeded";

/// Turn a non-2xx response into a structured error.
///
/// Total function: a body that is not JSON falls back to the canonical
/// status reason, and an unknown status still yields a well-formed error.
/// `context` names the operation in progress ("creating an issue", ...).
pub fn normalize(
    status: u16,
    body: &[u8],
    method: Option<&str>,
    path: Option<&str>,
    context: &str,
) -> ApiError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();

    let detail = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status_reason(status).to_string());

    let (kind, message) = match status {
        401 => (
            ApiErrorKind::Unauthorized,
            format!("Authentication failed while {}: {}", context, detail),
        ),
        403 if detail.contains(RATE_LIMIT_MARKER) => (
            ApiErrorKind::RateLimited,
            format!("Rate limit exceeded while {}. Please try again later.", context),
        ),
        403 => (
            ApiErrorKind::Forbidden,
            format!("Access denied while {}: {}", context, detail),
        ),
        404 => (
            ApiErrorKind::NotFound,
            format!("Resource not found while {}: {}", context, detail),
        ),
        422 => (
            ApiErrorKind::InvalidRequest,
            format!("Invalid request while {}: {}", context, detail),
        ),
        _ => (
            ApiErrorKind::Unknown,
            format!("GitHub API error ({}) while {}: {}", status, context, detail),
        ),
    };

    ApiError {
        kind,
        message,
        status: Some(status),
        method: method.map(str::to_string),
        path: path.map(str::to_string),
        body: parsed,
    }
}

fn status_reason(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unknown error")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({ "message": message })).expect("body")
    }

    #[test]
    fn status_table_maps_to_kinds() {
        let cases = [
            (401, ApiErrorKind::Unauthorized),
            (404, ApiErrorKind::NotFound),
            (422, ApiErrorKind::InvalidRequest),
            (500, ApiErrorKind::Unknown),
            (502, ApiErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            let err = normalize(status, &body("boom"), Some("GET"), Some("/x"), "testing things");
            assert_eq!(err.kind, kind, "status {}", status);
            assert!(err.message.contains("testing things"), "status {}", status);
            assert_eq!(err.status, Some(status));
        }
    }

    #[test]
    fn rate_limited_403_is_distinguished_from_forbidden() {
        let err = normalize(
            403,
            &body("API rate limit exceeded for user"),
            Some("GET"),
            Some("/search/code"),
            "searching code",
        );
        assert_eq!(err.kind, ApiErrorKind::RateLimited);
        assert!(err.message.contains("searching code"));
    }

    #[test]
    fn plain_403_is_forbidden() {
        let err = normalize(
            403,
            &body("must have admin rights"),
            Some("PATCH"),
            Some("/repos/a/b/issues/1"),
            "updating an issue",
        );
        assert_eq!(err.kind, ApiErrorKind::Forbidden);
        assert!(err.message.contains("must have admin rights"));
    }

    #[test]
    fn unparseable_body_falls_back_to_status_text() {
        let err = normalize(404, b"<html>not json</html>", Some("GET"), Some("/x"), "getting file contents");
        assert_eq!(err.kind, ApiErrorKind::NotFound);
        assert!(err.message.contains("Not Found"));
        assert!(err.message.contains("getting file contents"));
        assert!(err.body.is_none());
    }

    #[test]
    fn empty_body_still_produces_an_error() {
        let err = normalize(401, b"", None, None, "creating a pull request");
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert!(err.message.contains("creating a pull request"));
    }

    #[test]
    fn body_without_message_field_uses_status_text() {
        let raw = serde_json::to_vec(&serde_json::json!({ "documentation_url": "https://docs" })).expect("body");
        let err = normalize(422, &raw, Some("POST"), Some("/repos/a/b/pulls"), "creating a pull request");
        assert_eq!(err.kind, ApiErrorKind::InvalidRequest);
        assert!(err.message.contains("Unprocessable Entity"));
        // The JSON body is preserved for diagnosis even without a message.
        assert!(err.body.is_some());
    }

    #[test]
    fn origin_method_and_path_are_recorded() {
        let err = normalize(404, &body("Not Found"), Some("GET"), Some("/repos/a/b"), "forking a repository");
        assert_eq!(err.method.as_deref(), Some("GET"));
        assert_eq!(err.path.as_deref(), Some("/repos/a/b"));
    }
}
