//! Credential types shared by the signer and the verifier.

use std::fmt;

/// An api key and its shared HMAC secret.
///
/// The key travels in clear as `X-Api-Key`; the secret never leaves the
/// process. `Debug` output redacts the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    api_key: String,
    api_secret: String,
}

impl Credential {
    /// Create a credential from an api key and its secret.
    ///
    /// Empty values are accepted here; signing with an empty secret is
    /// rejected at signing time.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// The public api key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The shared secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
