//! Client error type.

use recall_auth::SignError;
use reqwest::StatusCode;

/// Errors returned by [`RecallClient`](crate::RecallClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be signed.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// The request never produced a response.
    #[error("request to {path} failed: {source}")]
    Transport {
        /// Request path.
        path: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not JSON, or not the expected shape.
    #[error("Invalid JSON response from {path}: {source}")]
    InvalidJson {
        /// Request path.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Api {
        /// Response status.
        status: StatusCode,
        /// `error.code` from the response envelope, when present.
        code: Option<String>,
        /// `error.message` from the envelope, or a status fallback.
        message: String,
    },
}

impl ClientError {
    /// Build an [`ClientError::Api`] from a failed response's parsed body.
    ///
    /// Reads `{"error":{"code":"...","message":"..."}}`. A missing or empty
    /// message falls back to `Request failed with status N`.
    #[must_use]
    pub fn from_envelope(status: StatusCode, payload: &serde_json::Value) -> Self {
        let error = payload.get("error");
        let field = |name: &str| {
            error
                .and_then(|e| e.get(name))
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        Self::Api {
            status,
            code: field("code"),
            message: field("message")
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
        }
    }

    /// The HTTP status, for errors that carry one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            Self::Sign(_) | Self::InvalidJson { .. } => None,
        }
    }
}
