//! Cache → rate limit → retrying network call → normalize → cache.
//!
//! Every catalog read goes through [`FetchPipeline::request`]:
//! 1. Derive a cache key from the endpoint's canonical identity
//! 2. Serve from cache when fresh (no wait, no network)
//! 3. Otherwise take the flight lock, wait on the rate limiter and call out,
//!    retrying transient failures with linear backoff
//! 4. Normalize, store, return
//!
//! Failures are never cached.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::endpoint::{Endpoint, SearchOptions};
use super::normalize::{normalize_detail, normalize_search};
use super::transport::CatalogTransport;
use crate::cache::{derive_key, CacheStore};
use crate::config::{PipelineConfig, RetryConfig};
use crate::errors::{NextUpError, Result};
use crate::models::{CatalogRecord, SearchPage};
use crate::ratelimit::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Cache,
    Network,
}

/// A pipeline result tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fetched<T> {
    pub value: T,
    pub source: FetchSource,
    /// Network attempts made; zero for cache hits.
    pub attempts: u32,
}

impl<T> Fetched<T> {
    pub fn from_cache(&self) -> bool {
        self.source == FetchSource::Cache
    }
}

pub struct FetchPipeline {
    transport: Arc<dyn CatalogTransport>,
    cache: Arc<CacheStore>,
    limiter: RateLimiter,
    /// Held from the post-miss cache re-check until the result is stored,
    /// so at most one network call is in flight per pipeline.
    flight: Mutex<()>,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    retry: RetryConfig,
    default_page_size: u32,
}

impl FetchPipeline {
    pub fn new(
        config: &PipelineConfig,
        transport: Arc<dyn CatalogTransport>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            transport,
            cache,
            limiter: RateLimiter::from_config(&config.rate_limit),
            flight: Mutex::new(()),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout(),
            retry: config.retry.clone(),
            default_page_size: config.default_page_size,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Free-text search returning one bounded page of summary records.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Fetched<SearchPage>> {
        self.search_with_deadline(query, options, None).await
    }

    pub async fn search_with_deadline(
        &self,
        query: &str,
        options: &SearchOptions,
        deadline: Option<Instant>,
    ) -> Result<Fetched<SearchPage>> {
        let endpoint = Endpoint::search(query, options, self.default_page_size);
        let page_size = endpoint.page_size();
        self.request(&endpoint, deadline, move |data| normalize_search(data, page_size))
            .await
    }

    /// Detailed record for one provider id.
    pub async fn get_by_id(&self, id: u64) -> Result<Fetched<CatalogRecord>> {
        self.get_by_id_with_deadline(id, None).await
    }

    pub async fn get_by_id_with_deadline(
        &self,
        id: u64,
        deadline: Option<Instant>,
    ) -> Result<Fetched<CatalogRecord>> {
        let endpoint = Endpoint::detail(id);
        self.request(&endpoint, deadline, move |data| normalize_detail(data, id))
            .await
    }

    /// Look up several ids one after another.
    ///
    /// Individual failures are logged and skipped; successes come back in
    /// input order.
    pub async fn get_many(&self, ids: &[u64]) -> Vec<CatalogRecord> {
        let mut records = Vec::with_capacity(ids.len());

        for &id in ids {
            match self.get_by_id(id).await {
                Ok(fetched) => records.push(fetched.value),
                Err(e) => {
                    log::warn!("Failed to fetch catalog record {}: {}", id, e);
                }
            }
        }

        records
    }

    /// Run one endpoint through the full pipeline.
    pub async fn request<T, F>(
        &self,
        endpoint: &Endpoint,
        deadline: Option<Instant>,
        normalize: F,
    ) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(Value) -> Result<T>,
    {
        let key = derive_key(&endpoint.canonical_identity());

        if let Some(hit) = self.cached::<T>(&key).await {
            return Ok(hit);
        }

        let _flight = within(deadline, self.flight.lock()).await?;

        // Another caller may have filled it while we queued.
        if let Some(hit) = self.cached::<T>(&key).await {
            return Ok(hit);
        }

        let (data, attempts) = self.fetch_with_retry(endpoint, deadline).await?;
        let value = normalize(data)?;

        match serde_json::to_value(&value) {
            Ok(payload) => self.cache.put(&key, payload).await,
            Err(e) => log::warn!("Could not cache {} result: {}", endpoint.operation(), e),
        }

        Ok(Fetched {
            value,
            source: FetchSource::Network,
            attempts,
        })
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<Fetched<T>> {
        let payload = self.cache.get(key).await?;

        match serde_json::from_value::<T>(payload) {
            Ok(value) => Some(Fetched {
                value,
                source: FetchSource::Cache,
                attempts: 0,
            }),
            Err(e) => {
                log::warn!("Dropping unreadable cache entry {}: {}", key, e);
                self.cache.invalidate(key).await;
                None
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        endpoint: &Endpoint,
        deadline: Option<Instant>,
    ) -> Result<(Value, u32)> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let mut params = endpoint.query_params();
        if !self.api_key.is_empty() {
            params.push(("key".to_string(), self.api_key.clone()));
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            within(deadline, self.limiter.acquire()).await?;

            log::debug!(
                "[{}/{}] {} {}",
                attempt,
                max_attempts,
                endpoint.operation(),
                url
            );

            let error = match within(deadline, self.attempt_once(&url, &params)).await? {
                Ok(data) => return Ok((data, attempt)),
                Err(e) => e,
            };

            if !error.is_retryable() {
                log::warn!("{} failed permanently: {}", endpoint.operation(), error);
                return Err(error);
            }

            if attempt >= max_attempts {
                log::error!(
                    "✗ {} failed after {} attempts: {}",
                    endpoint.operation(),
                    attempt,
                    error
                );
                return Err(error);
            }

            let delay = self.retry.delay_after(attempt);
            log::warn!(
                "[{}/{}] {} failed: {}, retrying in {:?}",
                attempt,
                max_attempts,
                endpoint.operation(),
                error,
                delay
            );

            if let Some(deadline) = deadline {
                let resume_at = Instant::now().checked_add(delay);
                if resume_at.map_or(true, |at| at > deadline) {
                    log::warn!("{} abandoned: backoff would pass the deadline", endpoint.operation());
                    return Err(NextUpError::DeadlineExceeded);
                }
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt_once(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let response = match tokio::time::timeout(
            self.request_timeout,
            self.transport.get(url, params, self.request_timeout),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(NextUpError::Timeout(self.request_timeout.as_millis() as u64)),
        };

        if !response.is_success() {
            return Err(NextUpError::from_status(response.status, &response.body));
        }

        serde_json::from_str(&response.body)
            .map_err(|e| NextUpError::Parse(format!("JSON error at {}: {}", url, e)))
    }
}

/// Bound a future by the caller's deadline, if any.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Result<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| NextUpError::DeadlineExceeded),
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use crate::catalog::transport::testing::{ScriptedTransport, Step};
    use crate::clock::ManualClock;
    use crate::config::RateLimitConfig;
    use chrono::DateTime;
    use serde_json::json;

    fn config() -> PipelineConfig {
        PipelineConfig {
            api_base_url: "https://catalog.test/api/".to_string(),
            api_key: "secret".to_string(),
            request_timeout_ms: 1_000,
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 100,
            },
            rate_limit: RateLimitConfig {
                max_requests: 100,
                period_ms: 1_000,
            },
            ..PipelineConfig::default()
        }
    }

    fn pipeline(config: &PipelineConfig, transport: Arc<ScriptedTransport>) -> FetchPipeline {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let cache = Arc::new(CacheStore::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(clock),
            &config.cache,
        ));
        FetchPipeline::new(config, transport, cache)
    }

    fn game(id: u64, name: &str) -> Value {
        json!({ "id": id, "name": name, "genres": [{ "name": "Indie" }], "playtime": 6 })
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_identical_request_is_served_from_cache() {
        let transport = ScriptedTransport::ok(json!({ "count": 1, "results": [game(1, "Celeste")] }));
        let pipeline = pipeline(&config(), transport.clone());

        let first = pipeline.search("Celeste", &SearchOptions::default()).await.unwrap();
        let second = pipeline.search("  celeste ", &SearchOptions::default()).await.unwrap();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(first.source, FetchSource::Network);
        assert_eq!(first.attempts, 1);
        assert!(second.from_cache());
        assert_eq!(second.attempts, 0);
        assert_eq!(first.value, second.value);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_carries_key_and_params() {
        let transport = ScriptedTransport::ok(game(42, "Outer Wilds"));
        let pipeline = pipeline(&config(), transport.clone());

        pipeline.get_by_id(42).await.unwrap();

        let requests = transport.requests.lock().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "https://catalog.test/api/games/42");
        assert!(requests[0].1.contains(&("key".to_string(), "secret".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success_backs_off_twice() {
        let transport = ScriptedTransport::new(vec![
            Step::Respond(503, "busy".into()),
            Step::Fail(NextUpError::Network("connection reset".into())),
        ]);
        transport.set_fallback(200, game(7, "Hades"));
        let pipeline = pipeline(&config(), transport.clone());

        let start = Instant::now();
        let fetched = pipeline.get_by_id(7).await.unwrap();

        assert_eq!(fetched.value.title, "Hades");
        assert_eq!(fetched.attempts, 3);
        assert_eq!(transport.call_count(), 3);
        // Backoff pauses of 100ms and 200ms, nothing else.
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_surface_last_error_and_cache_nothing() {
        let transport = ScriptedTransport::new(vec![
            Step::Fail(NextUpError::Network("reset".into())),
            Step::Respond(500, "boom".into()),
            Step::Respond(502, "bad gateway".into()),
        ]);
        let pipeline = pipeline(&config(), transport.clone());

        let err = pipeline.get_by_id(7).await.unwrap_err();

        assert_eq!(
            err,
            NextUpError::Http {
                status: 502,
                body: "bad gateway".into()
            }
        );
        assert_eq!(transport.call_count(), 3);
        assert_eq!(pipeline.cache().stats().await.entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_poison_later_requests() {
        let transport = ScriptedTransport::new(vec![Step::Respond(404, "nope".into())]);
        transport.set_fallback(200, game(9, "Tunic"));
        let pipeline = pipeline(&config(), transport.clone());

        assert!(matches!(pipeline.get_by_id(9).await, Err(NextUpError::NotFound(_))));
        let retried = pipeline.get_by_id(9).await.unwrap();

        assert_eq!(retried.source, FetchSource::Network);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Step::Respond(401, "invalid key".into())]);
        transport.set_fallback(200, game(1, "never"));
        let pipeline = pipeline(&config(), transport.clone());

        let err = pipeline.get_by_id(1).await.unwrap_err();

        assert!(matches!(err, NextUpError::Http { status: 401, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_response_is_retried() {
        let transport = ScriptedTransport::new(vec![Step::Respond(429, "slow down".into())]);
        transport.set_fallback(200, game(3, "Inside"));
        let pipeline = pipeline(&config(), transport.clone());

        let fetched = pipeline.get_by_id(3).await.unwrap();
        assert_eq!(fetched.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out_and_retries() {
        let transport = ScriptedTransport::new(vec![Step::Hang]);
        transport.set_fallback(200, game(5, "Journey"));
        let pipeline = pipeline(&config(), transport.clone());

        let start = Instant::now();
        let fetched = pipeline.get_by_id(5).await.unwrap();

        assert_eq!(fetched.attempts, 2);
        // 1s attempt timeout + 100ms backoff.
        assert_eq!(start.elapsed(), Duration::from_millis(1_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_and_skips_retries() {
        let transport = ScriptedTransport::new(vec![Step::Hang]);
        transport.set_fallback(200, game(5, "Journey"));
        let pipeline = pipeline(&config(), transport.clone());

        let deadline = Instant::now() + Duration::from_millis(500);
        let err = pipeline.get_by_id_with_deadline(5, Some(deadline)).await.unwrap_err();

        assert_eq!(err, NextUpError::DeadlineExceeded);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(pipeline.cache().stats().await.entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_shorter_than_backoff_skips_retry() {
        let transport = ScriptedTransport::new(vec![Step::Respond(503, "busy".into())]);
        transport.set_fallback(200, game(5, "Journey"));
        let pipeline = pipeline(&config(), transport.clone());

        let deadline = Instant::now() + Duration::from_millis(50);
        let err = pipeline.get_by_id_with_deadline(5, Some(deadline)).await.unwrap_err();

        assert_eq!(err, NextUpError::DeadlineExceeded);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_backoff_with_deadline_aborts() {
        let mut config = config();
        config.retry.base_delay_ms = u64::MAX;
        let transport = ScriptedTransport::new(vec![Step::Respond(503, "busy".into())]);
        transport.set_fallback(200, game(5, "Journey"));
        let pipeline = pipeline(&config, transport.clone());

        let deadline = Instant::now() + Duration::from_secs(5);
        let err = pipeline.get_by_id_with_deadline(5, Some(deadline)).await.unwrap_err();

        assert_eq!(err, NextUpError::DeadlineExceeded);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_body_is_parse_error() {
        let transport = ScriptedTransport::new(vec![Step::Respond(200, "<html>".into())]);
        let pipeline = pipeline(&config(), transport.clone());

        assert!(matches!(pipeline.get_by_id(1).await, Err(NextUpError::Parse(_))));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_cache_entry_is_refetched() {
        let transport = ScriptedTransport::ok(game(11, "Celeste"));
        let pipeline = pipeline(&config(), transport.clone());
        let key = derive_key(&Endpoint::detail(11).canonical_identity());
        pipeline.cache().put(&key, json!("not a record")).await;

        let fetched = pipeline.get_by_id(11).await.unwrap();

        assert_eq!(fetched.source, FetchSource::Network);
        assert_eq!(fetched.value.title, "Celeste");
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_many_skips_failures_in_order() {
        let transport = ScriptedTransport::new(vec![
            Step::Respond(200, game(1, "One").to_string()),
            Step::Respond(404, "gone".into()),
            Step::Respond(200, game(3, "Three").to_string()),
        ]);
        let pipeline = pipeline(&config(), transport.clone());

        let records = pipeline.get_many(&[1, 2, 3]).await;

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Three"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_calls_respect_rate_limit() {
        let mut config = config();
        config.rate_limit = RateLimitConfig {
            max_requests: 1,
            period_ms: 1_000,
        };
        let transport = ScriptedTransport::ok(game(1, "Any"));
        let pipeline = pipeline(&config, transport.clone());

        let start = Instant::now();
        pipeline.get_by_id(1).await.unwrap();
        pipeline.get_by_id(2).await.unwrap();
        pipeline.get_by_id(3).await.unwrap();
        // Cache hit: no wait.
        pipeline.get_by_id(1).await.unwrap();

        assert_eq!(transport.call_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    }
}
