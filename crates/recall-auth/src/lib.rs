//! HMAC-SHA256 request signing and verification for the Recall API.
//!
//! A client signs each request with its shared secret; the server recomputes
//! the signature from the bytes it actually received and checks freshness and
//! replay before trusting the api key.
//!
//! # Overview
//!
//! Every signed request carries four headers: `X-Api-Key`, `X-Timestamp`
//! (Unix seconds), `X-Nonce` and `X-Signature`. The signature is the lowercase
//! hex HMAC-SHA256 of the canonical message
//! `METHOD\nPATH\nTIMESTAMP\nNONCE\nhex(sha256(body))`.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use recall_auth::clock::ManualClock;
//! use recall_auth::{Signer, StaticCredentialProvider, Verifier, VerifierConfig};
//! use recall_core::Credential;
//!
//! let credential = Credential::new("dev-key", "dev-secret");
//! let clock = Arc::new(ManualClock::new(1_735_787_045));
//!
//! let signer = Signer::new(credential.clone()).with_clock(clock.clone());
//! let signed = signer
//!     .sign("POST", "/ai/test", Some(&serde_json::json!({"hello": "world"})))
//!     .unwrap();
//!
//! let mut request = http::Request::builder()
//!     .method("POST")
//!     .uri("http://localhost:8080/ai/test")
//!     .body(())
//!     .unwrap();
//! signed.envelope.apply(request.headers_mut()).unwrap();
//! let (parts, ()) = request.into_parts();
//!
//! let verifier = Verifier::new(
//!     Arc::new(StaticCredentialProvider::from(credential)),
//!     VerifierConfig::default(),
//! )
//! .with_clock(clock);
//!
//! let result = verifier.verify(&parts, &signed.body).unwrap();
//! assert_eq!(result.api_key, "dev-key");
//! assert!(verifier.verify(&parts, &signed.body).is_err());
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical message construction and body hashing
//! - [`clock`] - Time and nonce sources
//! - [`credentials`] - Credential provider trait and in-memory implementation
//! - [`error`] - Signing, verification and rate-limit errors
//! - [`headers`] - Wire header names
//! - [`rate_limit`] - Per-key fixed-window request budgets
//! - [`replay`] - Concurrent nonce replay cache
//! - [`signer`] - Client-side signing
//! - [`verifier`] - Server-side verification

pub mod canonical;
pub mod clock;
pub mod credentials;
pub mod error;
pub mod headers;
pub mod rate_limit;
pub mod replay;
pub mod signer;
pub mod verifier;

pub use canonical::{build_canonical_message, hash_body};
pub use clock::{Clock, NonceSource, SystemClock};
pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::{AuthError, RateLimitExceeded, SignError};
pub use rate_limit::RateLimiter;
pub use replay::ReplayCache;
pub use signer::{SignOptions, SignedEnvelope, SignedRequest, Signer, sign, sign_bytes};
pub use verifier::{AuthResult, Verifier, VerifierConfig, signatures_match};
