//! Credential provider trait and implementations.
//!
//! This module defines the [`CredentialProvider`] trait for resolving shared
//! secrets from api keys, along with a [`StaticCredentialProvider`] for fixed
//! deployments and tests.

use std::collections::HashMap;

use recall_core::Credential;

use crate::error::AuthError;

/// Trait for looking up shared secrets by api key.
///
/// Implementations may back this with a database, configuration file,
/// or any other credential store.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret for the given api key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownClient`] if the api key is not recognized.
    fn get_secret(&self, api_key: &str) -> Result<String, AuthError>;
}

/// A simple in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use recall_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![
///     ("dev-key".to_owned(), "dev-secret".to_owned()),
/// ]);
///
/// let secret = provider.get_secret("dev-key").unwrap();
/// assert_eq!(secret, "dev-secret");
/// ```
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl StaticCredentialProvider {
    /// Create a new `StaticCredentialProvider` from an iterable of (api_key, secret) pairs.
    ///
    /// Pairs with an empty secret are dropped, so such a key is reported as unknown.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials
                .into_iter()
                .filter(|(_, secret)| !secret.is_empty())
                .collect(),
        }
    }

    /// Number of registered api keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no api keys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl From<Credential> for StaticCredentialProvider {
    fn from(credential: Credential) -> Self {
        Self::new([(
            credential.api_key().to_owned(),
            credential.api_secret().to_owned(),
        )])
    }
}

impl std::fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("api_keys", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret(&self, api_key: &str) -> Result<String, AuthError> {
        self.credentials
            .get(api_key)
            .cloned()
            .ok_or_else(|| AuthError::UnknownClient(api_key.to_owned()))
    }
}
