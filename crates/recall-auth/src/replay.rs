//! Replay protection.
//!
//! Provides [`ReplayCache`], a concurrent `(api_key, nonce) -> expiry` map.
//! The check-then-insert for a nonce happens inside a single `DashMap` entry
//! operation, so of any number of concurrent requests bearing the same pair
//! exactly one observes it as absent.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::AuthError;

/// Thread-safe store of recently accepted nonces.
///
/// # Examples
///
/// ```
/// use recall_auth::replay::ReplayCache;
///
/// let cache = ReplayCache::new();
/// assert!(cache.check_and_insert("dev-key", "n-1", 400, 100).is_ok());
/// assert!(cache.check_and_insert("dev-key", "n-1", 400, 101).is_err());
/// // The same nonce from another client is unrelated.
/// assert!(cache.check_and_insert("other-key", "n-1", 400, 101).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct ReplayCache {
    entries: DashMap<(String, String), u64>,
}

impl ReplayCache {
    /// Create a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Record `(api_key, nonce)` as used until `expires_at`.
    ///
    /// An entry whose expiry is already before `now` counts as absent and is
    /// overwritten; sweeping may simply not have reached it yet.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ReplayedNonce`] if the pair is present and unexpired.
    pub fn check_and_insert(
        &self,
        api_key: &str,
        nonce: &str,
        expires_at: u64,
        now: u64,
    ) -> Result<(), AuthError> {
        match self.entries.entry((api_key.to_owned(), nonce.to_owned())) {
            Entry::Occupied(mut entry) => {
                if *entry.get() < now {
                    entry.insert(expires_at);
                    Ok(())
                } else {
                    Err(AuthError::ReplayedNonce)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(())
            }
        }
    }

    /// Whether `(api_key, nonce)` is currently remembered and unexpired.
    #[must_use]
    pub fn contains(&self, api_key: &str, nonce: &str, now: u64) -> bool {
        self.entries
            .get(&(api_key.to_owned(), nonce.to_owned()))
            .is_some_and(|expiry| *expiry >= now)
    }

    /// Remove every entry that expired before `now`. Returns how many were removed.
    pub fn sweep(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expiry| *expiry >= now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of remembered nonces, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every nonce.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
