//! Rate limiting for key discovery
//!
//! A flood of tokens carrying unknown key identifiers (a rotation burst, or an
//! attacker minting random `kid`s) would otherwise turn into one discovery request
//! each. [`RateLimiter`] caps those requests with a sliding window that is shared by
//! every concurrent verification using the same resolver.
//!
//! ```rust
//! use routegate_auth::rate_limit::RateLimiter;
//!
//! let limiter = RateLimiter::per_minute(5);
//! for _ in 0..5 {
//!     assert!(limiter.try_acquire().is_ok());
//! }
//! let info = limiter.try_acquire().unwrap_err();
//! assert_eq!(info.limit, 5);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window rate limiter
///
/// Cloning shares the window. The lock is synchronous and is never held across an
/// await point.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
}

/// Information about a rate limit violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Time until the oldest request leaves the window
    pub retry_after: Duration,
    /// Maximum allowed requests
    pub limit: u32,
    /// Time window
    pub window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `limit` acquisitions per `window`
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a limiter allowing `limit` acquisitions per minute
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Record one request if the window has room
    ///
    /// Returns `Err(RateLimitInfo)` without recording anything when the window is full.
    pub fn try_acquire(&self) -> Result<(), RateLimitInfo> {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();

        // Remove timestamps outside the window
        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() as u32 >= self.limit {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(RateLimitInfo {
                retry_after,
                limit: self.limit,
                window: self.window,
            });
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Current `(used, limit)` for the window
    pub fn usage(&self) -> (u32, u32) {
        let now = Instant::now();
        let timestamps = self.timestamps.lock();
        let used = timestamps
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count() as u32;
        (used, self.limit)
    }

    /// Forget all recorded requests
    pub fn reset(&self) {
        self.timestamps.lock().clear();
    }
}
