use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::error::CacheError;

/// Fixed per-entry overhead added to the size estimate for the timestamp.
pub const ENTRY_OVERHEAD_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub stored_at: DateTime<Utc>,
    /// Estimated serialized size in bytes.
    pub size: usize,
}

impl CacheEntry {
    pub fn new(key: &str, payload: serde_json::Value, stored_at: DateTime<Utc>) -> Result<Self, CacheError> {
        let size = key.len() + serde_json::to_string(&payload)?.len() + ENTRY_OVERHEAD_BYTES;
        Ok(Self {
            key: key.to_string(),
            payload,
            stored_at,
            size,
        })
    }

    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            key: self.key.clone(),
            stored_at: self.stored_at,
            size: self.size,
        }
    }
}

/// Payload-free view of an entry, used for eviction and stats.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMeta {
    pub key: String,
    pub stored_at: DateTime<Utc>,
    pub size: usize,
}

/// Raw key/value storage beneath [`super::CacheStore`].
///
/// Backends only store and retrieve; expiry, size accounting and eviction
/// policy live in the store. Storing an existing key replaces it.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    async fn store(&self, entry: CacheEntry) -> Result<(), CacheError>;
    async fn remove(&self, keys: &[String]) -> Result<(), CacheError>;
    async fn index(&self) -> Result<Vec<EntryMeta>, CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
}

/// Process-local backend.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn store(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.lock().insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn index(&self) -> Result<Vec<EntryMeta>, CacheError> {
        Ok(self.entries.lock().values().map(CacheEntry::meta).collect())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().clear();
        Ok(())
    }
}
