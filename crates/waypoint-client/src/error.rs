//! Error taxonomy for the request pipeline.
//!
//! Every failure surfaced to the application is an [`ApiError`] carrying a
//! closed [`ErrorCode`], an optional HTTP status, a retryable flag, and an
//! optional request id for correlation. Transport and parse failures are
//! normalized into this shape before they reach the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Unknown,
    Network,
    Timeout,
    Unauthorized,
    Forbidden,
    TokenExpired,
    InvalidParameters,
    ResourceNotFound,
    Conflict,
    RateLimited,
    ServerError,
    ConfigurationError,
    ModuleNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::Network => "network",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::TokenExpired => "token-expired",
            ErrorCode::InvalidParameters => "invalid-parameters",
            ErrorCode::ResourceNotFound => "resource-not-found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::RateLimited => "rate-limited",
            ErrorCode::ServerError => "server-error",
            ErrorCode::ConfigurationError => "configuration-error",
            ErrorCode::ModuleNotFound => "module-not-found",
        }
    }

    /// Recognize a code embedded in a response body. Unrecognized strings
    /// return `None` so the status-derived code stays in effect.
    pub fn recognize(value: &str) -> Option<ErrorCode> {
        match value {
            "unknown" => Some(ErrorCode::Unknown),
            "network" => Some(ErrorCode::Network),
            "timeout" => Some(ErrorCode::Timeout),
            "unauthorized" => Some(ErrorCode::Unauthorized),
            "forbidden" => Some(ErrorCode::Forbidden),
            "token-expired" => Some(ErrorCode::TokenExpired),
            "invalid-parameters" => Some(ErrorCode::InvalidParameters),
            "resource-not-found" => Some(ErrorCode::ResourceNotFound),
            "conflict" => Some(ErrorCode::Conflict),
            "rate-limited" => Some(ErrorCode::RateLimited),
            "server-error" => Some(ErrorCode::ServerError),
            "configuration-error" => Some(ErrorCode::ConfigurationError),
            "module-not-found" => Some(ErrorCode::ModuleNotFound),
            _ => None,
        }
    }

    fn from_status(status: u16) -> ErrorCode {
        match status {
            400 => ErrorCode::InvalidParameters,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::ResourceNotFound,
            409 => ErrorCode::Conflict,
            429 => ErrorCode::RateLimited,
            500..=599 => ErrorCode::ServerError,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrow, per-category error payloads. The opaque raw-text form is
/// reserved for response bodies that fail structured parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetails {
    None,
    /// The response body could not be parsed as structured JSON.
    HttpBody { raw: String },
    /// The transport layer failed before a response arrived.
    Transport { kind: String },
    /// A request or response body failed (de)serialization.
    Serialization { what: String },
    /// A module lookup missed; carries the loaded module names.
    ModuleLookup { available: Vec<String> },
}

/// Best-effort rate-limit headroom parsed from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitInfo {
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
    pub reset: Option<u64>,
}

/// The one failure shape callers branch on, by `code` and `retryable`.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub message: String,
    pub code: ErrorCode,
    pub http_status: Option<u16>,
    pub details: ErrorDetails,
    pub request_id: Option<String>,
    /// Single source of truth the retry controller consults.
    pub retryable: bool,
    /// Server-directed wait, parsed from a 429 `retry-after` header.
    pub retry_after: Option<Duration>,
    /// Headroom parsed from `x-ratelimit-*` headers when present.
    pub rate_limit: Option<RateLimitInfo>,
}

/// Shape of a structured error body returned by the backend.
#[derive(Debug, Deserialize)]
struct WireError {
    message: Option<String>,
    code: Option<String>,
    request_id: Option<String>,
}

impl ApiError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            http_status: None,
            details: ErrorDetails::None,
            request_id: None,
            retryable: false,
            retry_after: None,
            rate_limit: None,
        }
    }

    /// A transport-level connection failure.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            details: ErrorDetails::Transport {
                kind: "connect".into(),
            },
            ..Self::new(ErrorCode::Network, message)
        }
    }

    /// A transport-level timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            details: ErrorDetails::Transport {
                kind: "timeout".into(),
            },
            ..Self::new(ErrorCode::Timeout, message)
        }
    }

    /// A request/response body that failed (de)serialization.
    pub fn serialization(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            details: ErrorDetails::Serialization { what: what.into() },
            ..Self::new(ErrorCode::Unknown, message)
        }
    }

    /// An invalid construction-time or dispatch-time configuration.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    /// A module lookup miss, enumerating the loaded module names.
    pub fn module_not_found(name: &str, available: Vec<String>) -> Self {
        Self {
            details: ErrorDetails::ModuleLookup {
                available: available.clone(),
            },
            ..Self::new(
                ErrorCode::ModuleNotFound,
                format!(
                    "module '{name}' is not loaded (available: {})",
                    available.join(", ")
                ),
            )
        }
    }

    /// Build the generic error from an HTTP response.
    ///
    /// The body is parsed as structured JSON when possible; parse failure
    /// never raises and instead produces an error carrying the raw text.
    /// A recognized code embedded in the body wins over the status-derived
    /// one. `retryable` is true iff the status is 429 or 5xx. A 429
    /// additionally picks up `retry-after` and `x-ratelimit-*` headers.
    pub fn from_response(status: u16, headers: &HashMap<String, String>, body: &str) -> Self {
        let (message, embedded_code, request_id, details) =
            match serde_json::from_str::<WireError>(body) {
                Ok(wire) => (
                    wire.message
                        .unwrap_or_else(|| format!("request failed with status {status}")),
                    wire.code.as_deref().and_then(ErrorCode::recognize),
                    wire.request_id,
                    ErrorDetails::None,
                ),
                Err(_) => (
                    if body.is_empty() {
                        format!("request failed with status {status}")
                    } else {
                        body.to_string()
                    },
                    None,
                    None,
                    ErrorDetails::HttpBody {
                        raw: body.to_string(),
                    },
                ),
            };

        let code = embedded_code.unwrap_or_else(|| ErrorCode::from_status(status));
        let retryable = status == 429 || (500..=599).contains(&status);

        let retry_after = if status == 429 {
            headers
                .get("retry-after")
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        } else {
            None
        };

        Self {
            message,
            code,
            http_status: Some(status),
            details,
            request_id,
            retryable,
            retry_after,
            rate_limit: parse_rate_limit_info(headers),
        }
    }

    /// True for the one failure kind the pipeline auto-recovers.
    pub fn is_rate_limited(&self) -> bool {
        self.code == ErrorCode::RateLimited
    }
}

/// Extract `x-ratelimit-{remaining,limit,reset}` headroom if any header is
/// present and numeric.
pub(crate) fn parse_rate_limit_info(headers: &HashMap<String, String>) -> Option<RateLimitInfo> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.trim().parse::<u64>().ok())
    };
    let info = RateLimitInfo {
        remaining: get("x-ratelimit-remaining"),
        limit: get("x-ratelimit-limit"),
        reset: get("x-ratelimit-reset"),
    };
    if info.remaining.is_none() && info.limit.is_none() && info.reset.is_none() {
        None
    } else {
        Some(info)
    }
}

/// Convenience Result type alias for pipeline operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn status_maps_to_code() {
        let cases = [
            (400, ErrorCode::InvalidParameters),
            (401, ErrorCode::Unauthorized),
            (403, ErrorCode::Forbidden),
            (404, ErrorCode::ResourceNotFound),
            (409, ErrorCode::Conflict),
            (429, ErrorCode::RateLimited),
            (500, ErrorCode::ServerError),
            (503, ErrorCode::ServerError),
            (599, ErrorCode::ServerError),
            (418, ErrorCode::Unknown),
        ];
        for (status, code) in cases {
            let error = ApiError::from_response(status, &no_headers(), "{}");
            assert_eq!(error.code, code, "status {status}");
            assert_eq!(error.http_status, Some(status));
        }
    }

    #[test]
    fn retryable_only_for_429_and_5xx() {
        assert!(ApiError::from_response(429, &no_headers(), "{}").retryable);
        assert!(ApiError::from_response(500, &no_headers(), "{}").retryable);
        assert!(ApiError::from_response(599, &no_headers(), "{}").retryable);
        assert!(!ApiError::from_response(404, &no_headers(), "{}").retryable);
        assert!(!ApiError::from_response(401, &no_headers(), "{}").retryable);
    }

    #[test]
    fn structured_body_fields_are_extracted() {
        let body = r#"{"message":"item missing","code":"resource-not-found","request_id":"req-9"}"#;
        let error = ApiError::from_response(404, &no_headers(), body);
        assert_eq!(error.message, "item missing");
        assert_eq!(error.code, ErrorCode::ResourceNotFound);
        assert_eq!(error.request_id.as_deref(), Some("req-9"));
        assert_eq!(error.details, ErrorDetails::None);
    }

    #[test]
    fn embedded_recognized_code_wins_over_status() {
        let body = r#"{"message":"session expired","code":"token-expired"}"#;
        let error = ApiError::from_response(401, &no_headers(), body);
        assert_eq!(error.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn embedded_unrecognized_code_falls_back_to_status() {
        let body = r#"{"message":"nope","code":"teapot"}"#;
        let error = ApiError::from_response(409, &no_headers(), body);
        assert_eq!(error.code, ErrorCode::Conflict);
    }

    #[test]
    fn non_json_body_never_raises() {
        let error = ApiError::from_response(500, &no_headers(), "<html>oops</html>");
        assert_eq!(error.code, ErrorCode::ServerError);
        assert_eq!(error.message, "<html>oops</html>");
        assert_eq!(
            error.details,
            ErrorDetails::HttpBody {
                raw: "<html>oops</html>".to_string()
            }
        );
    }

    #[test]
    fn empty_body_gets_a_status_message() {
        let error = ApiError::from_response(502, &no_headers(), "");
        assert_eq!(error.message, "request failed with status 502");
    }

    #[test]
    fn rate_limit_response_round_trips_retry_after() {
        let mut headers = no_headers();
        headers.insert("retry-after".to_string(), "5".to_string());
        let error = ApiError::from_response(429, &headers, "{}");
        assert_eq!(error.code, ErrorCode::RateLimited);
        assert!(error.retryable);
        assert_eq!(error.retry_after, Some(Duration::from_secs(5)));
    }

    #[test]
    fn retry_after_ignored_outside_429() {
        let mut headers = no_headers();
        headers.insert("retry-after".to_string(), "5".to_string());
        let error = ApiError::from_response(503, &headers, "{}");
        assert_eq!(error.retry_after, None);
    }

    #[test]
    fn rate_limit_headroom_is_parsed() {
        let mut headers = no_headers();
        headers.insert("x-ratelimit-remaining".to_string(), "0".to_string());
        headers.insert("x-ratelimit-limit".to_string(), "100".to_string());
        headers.insert("x-ratelimit-reset".to_string(), "1712345678".to_string());
        let error = ApiError::from_response(429, &headers, "{}");
        let info = error.rate_limit.expect("headroom expected");
        assert_eq!(info.remaining, Some(0));
        assert_eq!(info.limit, Some(100));
        assert_eq!(info.reset, Some(1712345678));
    }

    #[test]
    fn missing_headroom_headers_yield_none() {
        let error = ApiError::from_response(429, &no_headers(), "{}");
        assert_eq!(error.rate_limit, None);
    }

    #[test]
    fn module_not_found_enumerates_available() {
        let error =
            ApiError::module_not_found("billing", vec!["chat".to_string(), "profile".to_string()]);
        assert_eq!(error.code, ErrorCode::ModuleNotFound);
        assert!(error.message.contains("chat, profile"));
        assert_eq!(
            error.details,
            ErrorDetails::ModuleLookup {
                available: vec!["chat".to_string(), "profile".to_string()]
            }
        );
    }

    #[test]
    fn codes_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::InvalidParameters).unwrap(),
            "\"invalid-parameters\""
        );
        assert_eq!(ErrorCode::recognize("invalid-parameters"), Some(ErrorCode::InvalidParameters));
        assert_eq!(ErrorCode::recognize("bogus"), None);
    }
}
