//! Server-side verification of signed requests.
//!
//! A request moves through these checks in order, stopping at the first failure:
//!
//! 1. All four authentication headers are present and well formed
//!    ([`AuthError::MalformedRequest`]).
//! 2. The api key resolves to a secret ([`AuthError::UnknownClient`]).
//! 3. The signature recomputed from the actual method, path and body bytes
//!    matches, compared in constant time ([`AuthError::InvalidSignature`]).
//! 4. The timestamp is within the tolerance window ([`AuthError::StaleTimestamp`]).
//! 5. The `(api_key, nonce)` pair has not been accepted before
//!    ([`AuthError::ReplayedNonce`]).
//!
//! The order is observable: a replayed request whose timestamp has gone stale
//! fails on the timestamp, never reaching the nonce check.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http::HeaderName;
use recall_core::RecallConfig;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{build_canonical_message, hash_body};
use crate::clock::{Clock, SystemClock};
use crate::credentials::CredentialProvider;
use crate::error::AuthError;
use crate::headers::{X_API_KEY, X_NONCE, X_SIGNATURE, X_TIMESTAMP};
use crate::replay::ReplayCache;
use crate::signer::compute_signature;

/// Tunables for a [`Verifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Maximum `|now - X-Timestamp|` in seconds.
    pub tolerance_secs: u64,
    /// How long an accepted nonce is remembered. Values below
    /// `tolerance_secs` are raised to it.
    pub nonce_retention_secs: u64,
    /// Minimum spacing between opportunistic replay-cache sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: 300,
            nonce_retention_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl From<&RecallConfig> for VerifierConfig {
    fn from(config: &RecallConfig) -> Self {
        Self {
            tolerance_secs: config.tolerance_secs,
            nonce_retention_secs: config.nonce_retention_secs(),
            sweep_interval_secs: config.nonce_sweep_interval_secs,
        }
    }
}

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// The api key that signed the request.
    pub api_key: String,
    /// The signed timestamp.
    pub timestamp: u64,
    /// The nonce, now recorded in the replay cache.
    pub nonce: String,
}

/// Verifies signed requests against a credential store and a replay cache.
pub struct Verifier {
    credentials: Arc<dyn CredentialProvider>,
    clock: Arc<dyn Clock>,
    replay_cache: Arc<ReplayCache>,
    config: VerifierConfig,
    last_sweep: AtomicU64,
}

impl Verifier {
    /// Create a verifier using the system clock and a fresh replay cache.
    pub fn new(credentials: Arc<dyn CredentialProvider>, config: VerifierConfig) -> Self {
        Self {
            credentials,
            clock: Arc::new(SystemClock),
            replay_cache: Arc::new(ReplayCache::new()),
            config,
            last_sweep: AtomicU64::new(0),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share an existing replay cache.
    #[must_use]
    pub fn with_replay_cache(mut self, replay_cache: Arc<ReplayCache>) -> Self {
        self.replay_cache = replay_cache;
        self
    }

    /// The replay cache this verifier records nonces in.
    #[must_use]
    pub fn replay_cache(&self) -> &Arc<ReplayCache> {
        &self.replay_cache
    }

    /// The verifier's tunables.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Current time according to the verifier's clock.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Verify a request given its head and the raw body bytes as received.
    ///
    /// The body is hashed exactly as it arrived; it is never re-serialized.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first check that fails.
    pub fn verify(
        &self,
        parts: &http::request::Parts,
        body: &[u8],
    ) -> Result<AuthResult, AuthError> {
        let api_key = required_header(parts, &X_API_KEY)?;
        let timestamp_header = required_header(parts, &X_TIMESTAMP)?;
        let nonce = required_header(parts, &X_NONCE)?;
        let provided_signature = required_header(parts, &X_SIGNATURE)?;
        let timestamp = parse_timestamp(timestamp_header)?;

        let secret = self.credentials.get_secret(api_key)?;

        let body_hash = hash_body(body);
        let canonical = build_canonical_message(
            parts.method.as_str(),
            parts.uri.path(),
            timestamp,
            nonce,
            &body_hash,
        );

        debug!(canonical, api_key, "Rebuilt canonical message");

        let expected_signature = compute_signature(&secret, &canonical);
        if !signatures_match(&expected_signature, provided_signature) {
            return Err(AuthError::InvalidSignature);
        }

        let now = self.clock.now();
        let tolerance = self.config.tolerance_secs;
        if now.abs_diff(timestamp) > tolerance {
            return Err(AuthError::StaleTimestamp {
                timestamp,
                now,
                tolerance,
            });
        }

        // A timestamp ahead of the server clock stays acceptable until
        // `timestamp + tolerance`, so retention counts from the later of the two.
        let retention = self.config.nonce_retention_secs.max(tolerance);
        let expires_at = now.max(timestamp).saturating_add(retention);
        self.replay_cache
            .check_and_insert(api_key, nonce, expires_at, now)?;

        self.maybe_sweep(now);

        debug!(api_key, nonce, "Request authenticated");

        Ok(AuthResult {
            api_key: api_key.to_owned(),
            timestamp,
            nonce: nonce.to_owned(),
        })
    }

    /// Remove expired replay-cache entries now. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        self.last_sweep.store(now, Ordering::Relaxed);
        self.replay_cache.sweep(now)
    }

    fn maybe_sweep(&self, now: u64) {
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now < last.saturating_add(self.config.sweep_interval_secs) {
            return;
        }
        // Only one caller per interval does the sweep.
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let removed = self.replay_cache.sweep(now);
            if removed > 0 {
                debug!(removed, "Swept expired nonces");
            }
        }
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("config", &self.config)
            .field("replay_cache_len", &self.replay_cache.len())
            .finish_non_exhaustive()
    }
}

/// Compare a computed signature with a provided one in constant time.
///
/// The provided value is lowercased first. Lengths are not secret; slices of
/// different length compare unequal immediately.
///
/// # Examples
///
/// ```
/// use recall_auth::verifier::signatures_match;
///
/// assert!(signatures_match("abc123", "ABC123"));
/// assert!(!signatures_match("abc123", "abc124"));
/// ```
#[must_use]
pub fn signatures_match(expected: &str, provided: &str) -> bool {
    let provided = provided.to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Extract a required, non-empty, visible-ASCII header value.
fn required_header<'a>(
    parts: &'a http::request::Parts,
    name: &HeaderName,
) -> Result<&'a str, AuthError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| AuthError::MalformedRequest(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AuthError::MalformedRequest(format!("{name} header is not ASCII")))?;

    if value.is_empty() {
        return Err(AuthError::MalformedRequest(format!("empty {name} header")));
    }
    Ok(value)
}

/// Parse `X-Timestamp` as plain base-10 Unix seconds: digits only, no sign,
/// no whitespace, no leading zeros.
///
/// The canonical message re-renders the parsed value, so any header spelling
/// other than the canonical one would verify against a signature over
/// different bytes.
fn parse_timestamp(value: &str) -> Result<u64, AuthError> {
    let leading_zero = value.len() > 1 && value.starts_with('0');
    if leading_zero || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthError::MalformedRequest(format!(
            "invalid timestamp {value:?}"
        )));
    }
    value
        .parse()
        .map_err(|_| AuthError::MalformedRequest(format!("invalid timestamp {value:?}")))
}
