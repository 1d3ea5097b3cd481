//! Catalog response cache.
//!
//! [`CacheStore`] owns the policy (max age, size ceiling, oldest-first
//! eviction); a [`CacheBackend`] owns the bytes. Two backends ship: an
//! in-memory map and a SQLite table for caches that outlive the process.

pub mod backend;
pub mod error;
pub mod key;
pub mod sqlite;
pub mod store;

pub use backend::{CacheBackend, CacheEntry, EntryMeta, MemoryBackend};
pub use error::CacheError;
pub use key::derive_key;
pub use sqlite::SqliteBackend;
pub use store::{CacheStats, CacheStore};
