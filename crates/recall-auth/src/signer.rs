//! Client-side request signing.
//!
//! Signing is a pure function of its inputs plus a clock and a nonce source:
//!
//! 1. Serialize the body to compact JSON (or nothing).
//! 2. Hash the serialized bytes with SHA-256.
//! 3. Build the canonical message (see [`crate::canonical`]).
//! 4. `signature = hex(HMAC-SHA256(api_secret, canonical_message))`.
//!
//! The result carries the exact body bytes that were hashed; send those bytes,
//! not a re-serialization, or the server will compute a different body hash.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use hmac::{Hmac, KeyInit, Mac};
use http::{HeaderMap, HeaderValue};
use recall_core::Credential;
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;

use crate::canonical::{build_canonical_message, hash_body, serialize_body};
use crate::clock::{Clock, NonceSource, RandomNonce, SystemClock};
use crate::error::SignError;
use crate::headers::{CONTENT_TYPE_JSON, X_API_KEY, X_NONCE, X_SIGNATURE, X_TIMESTAMP};

type HmacSha256 = Hmac<Sha256>;

/// Overrides for the values signing would otherwise draw from its sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// Use this timestamp instead of the clock.
    pub timestamp: Option<u64>,
    /// Use this nonce instead of a generated one.
    pub nonce: Option<String>,
}

/// The authentication headers attached to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Value of `X-Api-Key`.
    pub api_key: String,
    /// Value of `X-Timestamp`.
    pub timestamp: u64,
    /// Value of `X-Nonce`.
    pub nonce: String,
    /// Value of `X-Signature`.
    pub signature: String,
}

impl SignedEnvelope {
    /// The five headers in their conventional spelling.
    #[must_use]
    pub fn headers(&self) -> [(&'static str, String); 5] {
        [
            ("X-Api-Key", self.api_key.clone()),
            ("X-Timestamp", self.timestamp.to_string()),
            ("X-Nonce", self.nonce.clone()),
            ("X-Signature", self.signature.clone()),
            ("Content-Type", CONTENT_TYPE_JSON.to_owned()),
        ]
    }

    /// Write the headers into `headers`, replacing any previous values.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidHeaderValue`] if the api key or nonce
    /// contains characters not allowed in a header.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), SignError> {
        headers.insert(X_API_KEY, header_value(&self.api_key)?);
        headers.insert(X_TIMESTAMP, HeaderValue::from(self.timestamp));
        headers.insert(X_NONCE, header_value(&self.nonce)?);
        headers.insert(X_SIGNATURE, header_value(&self.signature)?);
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        Ok(())
    }

    /// Render the headers into a fresh `HeaderMap`.
    ///
    /// # Errors
    ///
    /// See [`SignedEnvelope::apply`].
    pub fn to_header_map(&self) -> Result<HeaderMap, SignError> {
        let mut headers = HeaderMap::with_capacity(5);
        self.apply(&mut headers)?;
        Ok(headers)
    }
}

/// A signed request ready to send: headers plus the exact body bytes that were hashed.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// The authentication headers.
    pub envelope: SignedEnvelope,
    /// Serialized body; empty when the request has no body.
    pub body: Bytes,
}

/// Compute the hex HMAC-SHA256 of a canonical message.
///
/// # Examples
///
/// ```
/// use recall_auth::signer::compute_signature;
///
/// let signature = compute_signature("dev-secret", "GET\n/\n0\nn\nh");
/// assert_eq!(signature.len(), 64);
/// ```
#[must_use]
pub fn compute_signature(api_secret: &str, canonical_message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(api_secret.as_bytes()).expect("HMAC can accept keys of any length");
    mac.update(canonical_message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign raw body bytes with an explicit timestamp and nonce.
///
/// This is the primitive every other entry point funnels into.
pub fn sign_bytes(
    method: &str,
    path: &str,
    body: &[u8],
    credential: &Credential,
    timestamp: u64,
    nonce: &str,
) -> Result<SignedEnvelope, SignError> {
    if method.is_empty() {
        return Err(SignError::EmptyMethod);
    }
    if path.is_empty() {
        return Err(SignError::EmptyPath);
    }
    if nonce.is_empty() {
        return Err(SignError::EmptyNonce);
    }
    if credential.api_secret().is_empty() {
        return Err(SignError::EmptySecret);
    }
    // Both travel as header values; refuse to sign what cannot be sent.
    for value in [credential.api_key(), nonce] {
        if !is_header_token(value) {
            return Err(SignError::InvalidHeaderValue(value.to_owned()));
        }
    }

    let body_hash = hash_body(body);
    let canonical = build_canonical_message(method, path, timestamp, nonce, &body_hash);

    debug!(canonical, api_key = %credential.api_key(), "Built canonical message");

    Ok(SignedEnvelope {
        api_key: credential.api_key().to_owned(),
        timestamp,
        nonce: nonce.to_owned(),
        signature: compute_signature(credential.api_secret(), &canonical),
    })
}

/// Sign a request using the system clock and a random nonce unless overridden.
///
/// # Examples
///
/// ```
/// use recall_auth::signer::{SignOptions, sign};
/// use recall_core::Credential;
///
/// let signed = sign(
///     "POST",
///     "/ai/test",
///     Some(&serde_json::json!({"hello": "world"})),
///     &Credential::new("dev-key", "dev-secret"),
///     &SignOptions {
///         timestamp: Some(1735787045),
///         nonce: Some("rn-fixed-nonce".to_owned()),
///     },
/// )
/// .unwrap();
///
/// assert_eq!(
///     signed.envelope.signature,
///     "d89ebaaa5905d78d2240ae0edc897c7f9e5d1884582d6231f7965532ce00b23a"
/// );
/// ```
pub fn sign<T>(
    method: &str,
    path: &str,
    body: Option<&T>,
    credential: &Credential,
    options: &SignOptions,
) -> Result<SignedRequest, SignError>
where
    T: Serialize + ?Sized,
{
    sign_with_sources(
        method,
        path,
        body,
        credential,
        options,
        &SystemClock,
        &RandomNonce,
    )
}

fn sign_with_sources<T>(
    method: &str,
    path: &str,
    body: Option<&T>,
    credential: &Credential,
    options: &SignOptions,
    clock: &dyn Clock,
    nonces: &dyn NonceSource,
) -> Result<SignedRequest, SignError>
where
    T: Serialize + ?Sized,
{
    let body = serialize_body(body)?;
    let timestamp = options.timestamp.unwrap_or_else(|| clock.now());
    let nonce = options
        .nonce
        .clone()
        .unwrap_or_else(|| nonces.next_nonce());

    let envelope = sign_bytes(method, path, &body, credential, timestamp, &nonce)?;
    Ok(SignedRequest {
        envelope,
        body: Bytes::from(body),
    })
}

/// A reusable signer bound to one credential.
///
/// Holds its clock and nonce source explicitly rather than reaching for
/// process-wide state.
#[derive(Clone)]
pub struct Signer {
    credential: Credential,
    clock: Arc<dyn Clock>,
    nonces: Arc<dyn NonceSource>,
}

impl Signer {
    /// Create a signer using the system clock and random nonces.
    #[must_use]
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            clock: Arc::new(SystemClock),
            nonces: Arc::new(RandomNonce),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the nonce source.
    #[must_use]
    pub fn with_nonce_source(mut self, nonces: Arc<dyn NonceSource>) -> Self {
        self.nonces = nonces;
        self
    }

    /// The credential this signer signs with.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Sign a request with a fresh timestamp and nonce.
    pub fn sign<T>(&self, method: &str, path: &str, body: Option<&T>) -> Result<SignedRequest, SignError>
    where
        T: Serialize + ?Sized,
    {
        self.sign_with(method, path, body, &SignOptions::default())
    }

    /// Sign a request, honouring any overrides in `options`.
    pub fn sign_with<T>(
        &self,
        method: &str,
        path: &str,
        body: Option<&T>,
        options: &SignOptions,
    ) -> Result<SignedRequest, SignError>
    where
        T: Serialize + ?Sized,
    {
        sign_with_sources(
            method,
            path,
            body,
            &self.credential,
            options,
            self.clock.as_ref(),
            self.nonces.as_ref(),
        )
    }

    /// Sign an already-built request in place using its raw body bytes.
    ///
    /// The canonical path is the URI path; any query string is not signed.
    pub fn sign_request(&self, request: &mut http::Request<Bytes>) -> Result<SignedEnvelope, SignError> {
        let envelope = sign_bytes(
            request.method().as_str(),
            request.uri().path(),
            request.body(),
            &self.credential,
            self.clock.now(),
            &self.nonces.next_nonce(),
        )?;
        envelope.apply(request.headers_mut())?;
        Ok(envelope)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

/// Visible ASCII only: no whitespace, no control bytes.
fn is_header_token(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_graphic())
}

fn header_value(value: &str) -> Result<HeaderValue, SignError> {
    HeaderValue::from_str(value).map_err(|_| SignError::InvalidHeaderValue(value.to_owned()))
}
