//! Time and nonce sources.
//!
//! Signing reads the wall clock and an entropy source; verification reads the
//! clock. Both sit behind traits so tests can pin them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of the current Unix time in whole seconds.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn now(&self) -> u64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use recall_auth::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_735_787_045);
/// clock.advance(10);
/// assert_eq!(clock.now(), 1_735_787_055);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `now`.
    #[must_use]
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Source of per-request nonces.
pub trait NonceSource: Send + Sync {
    /// Produce a fresh nonce.
    fn next_nonce(&self) -> String;
}

/// Nonces of the form `rn-<unix millis>-<32 hex chars>`.
///
/// The hex part is 128 bits from the thread-local CSPRNG, so collisions
/// inside any replay window are negligible regardless of the millisecond
/// prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNonce;

impl NonceSource for RandomNonce {
    fn next_nonce(&self) -> String {
        let millis = Utc::now().timestamp_millis();
        let entropy: u128 = rand::random();
        format!("rn-{millis}-{entropy:032x}")
    }
}
