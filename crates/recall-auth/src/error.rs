//! Error types for signing and verification.
//!
//! Verification failures are represented by [`AuthError`]. Every variant maps to
//! the same generic "authentication failed" response at the HTTP boundary; the
//! variant itself is only for server-side logs.

/// Errors that can occur while verifying a signed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A required header is missing, empty, or not parseable.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The api key is not known to the credential provider.
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    /// The provided signature does not match the recomputed one.
    #[error("Signature does not match")]
    InvalidSignature,

    /// The request timestamp is outside the tolerance window.
    #[error("Stale timestamp {timestamp} (now {now}, tolerance {tolerance}s)")]
    StaleTimestamp {
        /// The timestamp carried by the request.
        timestamp: u64,
        /// The server clock at verification time.
        now: u64,
        /// The configured tolerance in seconds.
        tolerance: u64,
    },

    /// The `(api_key, nonce)` pair was already accepted within its retention window.
    #[error("Replayed nonce")]
    ReplayedNonce,
}

impl AuthError {
    /// Short machine-readable reason, used as a structured log field.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::UnknownClient(_) => "unknown_client",
            Self::InvalidSignature => "invalid_signature",
            Self::StaleTimestamp { .. } => "stale_timestamp",
            Self::ReplayedNonce => "replayed_nonce",
        }
    }
}

/// Errors that can occur while signing a request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The HTTP method is empty.
    #[error("HTTP method must not be empty")]
    EmptyMethod,

    /// The request path is empty.
    #[error("Request path must not be empty")]
    EmptyPath,

    /// An explicitly supplied nonce is empty.
    #[error("Nonce must not be empty")]
    EmptyNonce,

    /// The credential has no secret; signing would produce a forgeable signature.
    #[error("API secret must not be empty")]
    EmptySecret,

    /// The body could not be serialized to JSON.
    #[error("Failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A value cannot be carried in an HTTP header.
    #[error("Value is not a valid header value: {0}")]
    InvalidHeaderValue(String),
}

/// An authenticated client exceeded its per-minute request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Rate limit exceeded, retry after {retry_after}s")]
pub struct RateLimitExceeded {
    /// Seconds until the current window closes (at least 1).
    pub retry_after: u64,
}
