use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{NextUpError, Result};
use crate::ranking::Weights;

pub const DEFAULT_API_BASE_URL: &str = "https://api.rawg.io/api";
pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const CACHE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60; // 7 days
pub const CACHE_MAX_SIZE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 40;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after failed attempt `n` is `base_delay_ms * n`.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay_ms: RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt as u64))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub period_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 1,
            period_ms: 1_000,
        }
    }
}

impl RateLimitConfig {
    /// 1 request per 1000ms => 1000ms between dispatches.
    pub fn min_interval(&self) -> Duration {
        if self.max_requests == 0 {
            return Duration::from_millis(self.period_ms);
        }
        Duration::from_micros(self.period_ms.saturating_mul(1_000) / self.max_requests as u64)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub max_age_secs: u64,
    pub max_size_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: CACHE_MAX_AGE_SECS,
            max_size_bytes: CACHE_MAX_SIZE_BYTES,
        }
    }
}

impl CacheConfig {
    /// Ages beyond what `TimeDelta` can hold mean "never expire".
    pub fn max_age(&self) -> chrono::TimeDelta {
        i64::try_from(self.max_age_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Everything the embedding application hands over at construction time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub api_base_url: String,
    /// Sent as the `key` query parameter on every request.
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub default_page_size: u32,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub weights: Weights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: String::new(),
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            default_page_size: DEFAULT_PAGE_SIZE,
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            weights: Weights::default(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(NextUpError::Config("api_base_url must not be empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(NextUpError::Config("request_timeout_ms must be positive".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(NextUpError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.period_ms == 0 {
            return Err(NextUpError::Config(
                "rate_limit needs a positive request count and period".into(),
            ));
        }
        self.weights.validate()
    }
}
