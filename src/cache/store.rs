use chrono::TimeDelta;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::backend::{CacheBackend, CacheEntry, EntryMeta};
use super::error::CacheError;
use crate::clock::Clock;
use crate::config::CacheConfig;

/// Share of entries removed by one eviction sweep.
const EVICTION_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub estimated_bytes: usize,
    /// Age of the oldest surviving entry, `None` when empty.
    pub oldest_age_hours: Option<f64>,
}

/// Age-expiring, size-bounded key/value cache.
///
/// Expiry is lazy (checked on `get`), eviction happens inside `put`. Backend
/// failures are logged and swallowed: a failed write is a no-op and a failed
/// read is a miss.
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    max_age: TimeDelta,
    max_size_bytes: usize,
    /// Serializes mutation (put, expiring get, eviction, clear).
    write_lock: Mutex<()>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>, config: &CacheConfig) -> Self {
        Self {
            backend,
            clock,
            max_age: config.max_age(),
            max_size_bytes: config.max_size_bytes,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the payload when present and not older than `max_age`.
    /// Expired entries are deleted on the way out.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let _guard = self.write_lock.lock().await;

        let entry = match self.backend.load(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                log::debug!("Cache miss for {}", key);
                return None;
            }
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let age = self.clock.now() - entry.stored_at;
        if age <= self.max_age {
            log::debug!("Cache hit for {} (age {}s)", key, age.num_seconds());
            return Some(entry.payload);
        }

        log::debug!("Cache entry {} expired (age {}s)", key, age.num_seconds());
        if let Err(e) = self.backend.remove(&[key.to_string()]).await {
            log::warn!("Failed to delete expired cache entry {}: {}", key, e);
        }
        None
    }

    /// Store a payload stamped with the current time, then evict the oldest
    /// entries if the store grew past its ceiling.
    pub async fn put(&self, key: &str, payload: serde_json::Value) {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.put_inner(key, payload).await {
            log::warn!("Cache write for {} dropped: {}", key, e);
        }
    }

    async fn put_inner(&self, key: &str, payload: serde_json::Value) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, payload, self.clock.now())?;
        self.backend.store(entry).await?;

        let index = match self.backend.index().await {
            Ok(index) => index,
            Err(e) => {
                // Without an index the ceiling can't be checked; don't keep
                // an entry that may have pushed the store past it.
                log::warn!(
                    "Cache index read failed after storing {}, skipping eviction and dropping the entry: {}",
                    key,
                    e
                );
                return self.backend.remove(&[key.to_string()]).await;
            }
        };
        self.enforce_ceiling(index).await
    }

    async fn enforce_ceiling(&self, mut index: Vec<EntryMeta>) -> Result<(), CacheError> {
        let mut total: usize = index.iter().map(|m| m.size).sum();
        if total <= self.max_size_bytes {
            return Ok(());
        }

        // Oldest first; the sort is stable so ties keep backend order.
        index.sort_by_key(|m| m.stored_at);

        let mut evicted = 0usize;
        while total > self.max_size_bytes && !index.is_empty() {
            let batch = ((index.len() as f64 * EVICTION_FRACTION).ceil() as usize).max(1);
            let victims: Vec<EntryMeta> = index.drain(..batch.min(index.len())).collect();
            let keys: Vec<String> = victims.iter().map(|m| m.key.clone()).collect();

            self.backend.remove(&keys).await?;

            total -= victims.iter().map(|m| m.size).sum::<usize>();
            evicted += victims.len();
        }

        log::info!(
            "Evicted {} cache entries to stay under {} bytes ({} bytes left)",
            evicted,
            self.max_size_bytes,
            total
        );
        Ok(())
    }

    /// Drop a single entry regardless of age.
    pub async fn invalidate(&self, key: &str) {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.backend.remove(&[key.to_string()]).await {
            log::warn!("Failed to invalidate cache entry {}: {}", key, e);
        }
    }

    /// Eagerly drop every expired entry. Returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let _guard = self.write_lock.lock().await;

        let index = match self.backend.index().await {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Cache index read failed: {}", e);
                return 0;
            }
        };

        let now = self.clock.now();
        let expired: Vec<String> = index
            .into_iter()
            .filter(|m| now - m.stored_at > self.max_age)
            .map(|m| m.key)
            .collect();

        if expired.is_empty() {
            return 0;
        }

        match self.backend.remove(&expired).await {
            Ok(()) => {
                log::info!("Evicted {} expired cache entries", expired.len());
                expired.len()
            }
            Err(e) => {
                log::warn!("Failed to evict expired cache entries: {}", e);
                0
            }
        }
    }

    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;

        match self.backend.clear().await {
            Ok(()) => log::info!("Catalog cache cleared"),
            Err(e) => log::warn!("Failed to clear catalog cache: {}", e),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let index = match self.backend.index().await {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Cache index read failed: {}", e);
                return CacheStats::default();
            }
        };

        let now = self.clock.now();
        let oldest_age_hours = index
            .iter()
            .map(|m| m.stored_at)
            .min()
            .map(|oldest| (now - oldest).num_milliseconds().max(0) as f64 / 3_600_000.0);

        CacheStats {
            entries: index.len(),
            estimated_bytes: index.iter().map(|m| m.size).sum(),
            oldest_age_hours,
        }
    }
}
