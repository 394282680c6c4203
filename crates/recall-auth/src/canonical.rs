//! Canonical message construction.
//!
//! Both the signer and the verifier reduce a request to the same string:
//!
//! ```text
//! METHOD\n
//! PATH\n
//! TIMESTAMP\n
//! NONCE\n
//! BODY_HASH
//! ```
//!
//! `METHOD` is uppercased, `PATH` is used exactly as given, `TIMESTAMP` is the
//! decimal Unix-seconds value and `BODY_HASH` is the lowercase hex SHA-256 of
//! the body bytes (the hash of the empty string when there is no body). There
//! is no trailing newline.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::SignError;

/// Lowercase hex SHA-256 of the empty body.
pub const EMPTY_BODY_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Build the canonical message from its five fields.
///
/// # Examples
///
/// ```
/// use recall_auth::canonical::{EMPTY_BODY_HASH, build_canonical_message};
///
/// let message = build_canonical_message("get", "/ai/test", 1735787045, "n-1", EMPTY_BODY_HASH);
/// assert_eq!(
///     message,
///     format!("GET\n/ai/test\n1735787045\nn-1\n{EMPTY_BODY_HASH}")
/// );
/// ```
#[must_use]
pub fn build_canonical_message(
    method: &str,
    path: &str,
    timestamp: u64,
    nonce: &str,
    body_hash: &str,
) -> String {
    let method = method.to_ascii_uppercase();
    format!("{method}\n{path}\n{timestamp}\n{nonce}\n{body_hash}")
}

/// Compute the lowercase hex SHA-256 of a body.
///
/// # Examples
///
/// ```
/// use recall_auth::canonical::{EMPTY_BODY_HASH, hash_body};
///
/// assert_eq!(hash_body(b""), EMPTY_BODY_HASH);
/// ```
#[must_use]
pub fn hash_body(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Serialize an optional body to compact JSON.
///
/// An absent body becomes zero bytes, not `null`.
pub fn serialize_body<T>(body: Option<&T>) -> Result<Vec<u8>, SignError>
where
    T: Serialize + ?Sized,
{
    match body {
        Some(value) => serde_json::to_vec(value).map_err(SignError::Serialization),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_should_join_fields_with_single_newlines() {
        let message = build_canonical_message("POST", "/ai/test", 1, "abc", "hash");
        assert_eq!(message, "POST\n/ai/test\n1\nabc\nhash");
        assert!(!message.ends_with('\n'));
    }

    #[test]
    fn test_should_uppercase_method_only() {
        let message = build_canonical_message("patch", "/Mixed/Case", 10, "Nonce", "h");
        assert_eq!(message, "PATCH\n/Mixed/Case\n10\nNonce\nh");
    }

    #[test]
    fn test_should_leave_path_untouched() {
        let message = build_canonical_message("GET", "/a%20b/?x=1", 10, "n", "h");
        assert!(message.contains("\n/a%20b/?x=1\n"));
    }

    #[test]
    fn test_should_hash_empty_body_to_sha256_of_empty_string() {
        assert_eq!(hash_body(b""), EMPTY_BODY_HASH);
    }

    #[test]
    fn test_should_hash_json_body() {
        assert_eq!(
            hash_body(br#"{"hello":"world"}"#),
            "93a23971a914e5eacbf0a8d25154cda309c3c1c72fbb9914d47c60f3cb681588"
        );
    }

    #[test]
    fn test_should_serialize_absent_body_as_empty() {
        let bytes = serialize_body::<serde_json::Value>(None).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_should_serialize_body_compactly() {
        let mut body = BTreeMap::new();
        body.insert("hello", "world");
        body.insert("asset_id", "a-1");
        let bytes = serialize_body(Some(&body)).unwrap();
        assert_eq!(bytes, br#"{"asset_id":"a-1","hello":"world"}"#);
    }

    #[test]
    fn test_should_propagate_serialization_errors() {
        let mut body = BTreeMap::new();
        body.insert(vec![1u8], "non-string key");
        let result = serialize_body(Some(&body));
        assert!(matches!(result, Err(SignError::Serialization(_))));
    }
}
