//! Wire names of the signing headers.
//!
//! Header names are matched case-insensitively on the wire; the constants here
//! are the lowercase forms `http::HeaderName` requires. The `DISPLAY_*` forms
//! are what clients conventionally send.

use http::HeaderName;

/// Public api key of the caller.
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Unix seconds at signing time.
pub const X_TIMESTAMP: HeaderName = HeaderName::from_static("x-timestamp");

/// Per-request nonce.
pub const X_NONCE: HeaderName = HeaderName::from_static("x-nonce");

/// Lowercase hex HMAC-SHA256 of the canonical message.
pub const X_SIGNATURE: HeaderName = HeaderName::from_static("x-signature");

/// Content type of every signed request.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Conventional spelling of the signing headers, in emission order.
pub const DISPLAY_NAMES: [&str; 5] = [
    "X-Api-Key",
    "X-Timestamp",
    "X-Nonce",
    "X-Signature",
    "Content-Type",
];
