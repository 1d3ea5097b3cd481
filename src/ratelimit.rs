//! Minimum-spacing rate limiter for outgoing catalog calls.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

/// Guarantees at least `min_interval` between the starts of any two
/// permitted continuations.
///
/// The lock is held across the wait, so concurrent callers queue up and are
/// released one interval apart.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.min_interval())
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait if necessary to comply with the rate limit.
    ///
    /// Returns how long the caller was suspended.
    pub async fn acquire(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                log::debug!("Rate limiting: waiting {:?}", waited);
                tokio::time::sleep(waited).await;
            }
        }

        *last = Some(Instant::now());
        waited
    }
}
