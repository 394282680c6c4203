//! JSON response formatting.

use serde::Serialize;

use crate::body::AuthResponseBody;
use crate::error::ServiceError;

/// Content type of every response.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serialize a `ServiceError` into the error envelope:
///
/// ```json
/// { "error": { "code": "unauthorized", "message": "Authentication failed." } }
/// ```
#[must_use]
pub fn error_to_json(error: &ServiceError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "error": {
            "code": error.code,
            "message": error.message,
        }
    }))
    .expect("JSON serialization of error cannot fail")
}

/// Convert a `ServiceError` into a complete HTTP error response.
#[must_use]
pub fn error_to_response(
    error: &ServiceError,
    request_id: &str,
) -> http::Response<AuthResponseBody> {
    let body = AuthResponseBody::from_bytes(error_to_json(error));

    let mut builder = http::Response::builder()
        .status(error.status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id);
    if let Some(retry_after) = error.retry_after {
        builder = builder.header(http::header::RETRY_AFTER, retry_after);
    }

    builder.body(body).expect("valid error response")
}

/// Build a JSON response from a serializable value.
#[must_use]
pub fn json_response<T: Serialize + ?Sized>(
    status: http::StatusCode,
    value: &T,
    request_id: &str,
) -> http::Response<AuthResponseBody> {
    let json = match serde_json::to_vec(value) {
        Ok(json) => json,
        Err(err) => {
            let err = ServiceError::internal(format!("Failed to serialize response: {err}"));
            return error_to_response(&err, request_id);
        }
    };

    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(AuthResponseBody::from_bytes(json))
        .expect("valid JSON response")
}
