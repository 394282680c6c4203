//! Fixed-window request budgets per api key.

use dashmap::DashMap;

use crate::error::RateLimitExceeded;

/// Length of one rate-limit window in seconds.
const WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: u64,
    count: u32,
}

/// Per-key counter of requests in the current minute.
///
/// Windows are aligned to wall-clock minutes (`now - now % 60`). The counter
/// resets when a request arrives in a later window.
///
/// # Examples
///
/// ```
/// use recall_auth::rate_limit::RateLimiter;
///
/// let limiter = RateLimiter::new(2);
/// assert!(limiter.check("dev-key", 120).is_ok());
/// assert!(limiter.check("dev-key", 121).is_ok());
/// assert_eq!(limiter.check("dev-key", 150).unwrap_err().retry_after, 30);
/// assert!(limiter.check("dev-key", 180).is_ok());
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    limit_per_minute: u32,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// Create a limiter allowing `limit_per_minute` requests per key per window.
    #[must_use]
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            limit_per_minute,
            windows: DashMap::new(),
        }
    }

    /// The configured budget.
    #[must_use]
    pub fn limit_per_minute(&self) -> u32 {
        self.limit_per_minute
    }

    /// Count one request for `api_key` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitExceeded`] when the key has used its budget for the
    /// current window; the request is not counted.
    pub fn check(&self, api_key: &str, now: u64) -> Result<(), RateLimitExceeded> {
        let window_start = now - now % WINDOW_SECS;
        let mut window = self
            .windows
            .entry(api_key.to_owned())
            .or_insert(Window {
                start: window_start,
                count: 0,
            });

        if window.start != window_start {
            *window = Window {
                start: window_start,
                count: 0,
            };
        }

        if window.count >= self.limit_per_minute {
            let retry_after = (window.start + WINDOW_SECS).saturating_sub(now).max(1);
            return Err(RateLimitExceeded { retry_after });
        }

        window.count += 1;
        Ok(())
    }

    /// Drop counters for windows that ended before `now`'s window.
    pub fn sweep(&self, now: u64) -> usize {
        let current = now - now % WINDOW_SECS;
        let before = self.windows.len();
        self.windows.retain(|_, window| window.start >= current);
        before.saturating_sub(self.windows.len())
    }
}
