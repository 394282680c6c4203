//! Errors rendered as HTTP responses.

use http::StatusCode;
use recall_auth::RateLimitExceeded;

/// An error that becomes an HTTP response of the form
/// `{"error":{"code":"...","message":"..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// HTTP status code.
    pub status: StatusCode,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message. Never carries the reason an authentication
    /// attempt failed.
    pub message: String,
    /// Value of the `Retry-After` header, if any.
    pub retry_after: Option<u64>,
}

impl ServiceError {
    /// Create an error with the given status, code and message.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    /// The single response for every authentication failure.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "Authentication failed.",
        )
    }

    /// Rate limit exceeded; retry after `retry_after` seconds.
    #[must_use]
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "rate-limit",
                "Rate limit exceeded. Try again later.",
            )
        }
    }

    /// Malformed or oversized request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad-request", message)
    }

    /// No route for the request.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "not-found",
            format!("No route for {path}"),
        )
    }

    /// Unexpected server-side failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl From<RateLimitExceeded> for ServiceError {
    fn from(err: RateLimitExceeded) -> Self {
        Self::rate_limited(err.retry_after)
    }
}
