//! Persistent SQLite-backed cache backend.
//!
//! Lets cached catalog responses survive restarts of the embedding app:
//!
//! ```text
//! [Request] → [CacheStore policy] → [SqliteBackend] → catalog_cache table
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::fs;
use std::path::Path;

use super::backend::{CacheBackend, CacheEntry, EntryMeta};
use super::error::CacheError;

#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
}

impl SqliteBackend {
    /// Wrap an existing pool and make sure the cache table exists.
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self, CacheError> {
        let backend = Self { pool };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Open (or create) a cache database file.
    pub async fn open(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| CacheError::Storage(e.to_string()))?;
            }
        }

        log::info!("Opening catalog cache database at: {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true),
            )
            .await?;

        Self::new(pool).await
    }

    /// Private in-memory database. One connection, since every sqlite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool).await
    }

    async fn init_schema(&self) -> Result<(), CacheError> {
        let schema = include_str!("schema.sql");

        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }
        Ok(())
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

#[async_trait]
impl CacheBackend for SqliteBackend {
    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let row: Option<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT payload_json, stored_at, size_bytes
            FROM catalog_cache
            WHERE cache_key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((payload_json, stored_at, size)) => {
                let payload: serde_json::Value = serde_json::from_str(&payload_json)?;
                Ok(Some(CacheEntry {
                    key: key.to_string(),
                    payload,
                    stored_at: from_millis(stored_at),
                    size: size.max(0) as usize,
                }))
            }
            None => Ok(None),
        }
    }

    async fn store(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let payload_json = serde_json::to_string(&entry.payload)?;

        sqlx::query(
            r#"
            INSERT INTO catalog_cache (cache_key, payload_json, stored_at, size_bytes)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                payload_json = excluded.payload_json,
                stored_at = excluded.stored_at,
                size_bytes = excluded.size_bytes
            "#,
        )
        .bind(&entry.key)
        .bind(&payload_json)
        .bind(entry.stored_at.timestamp_millis())
        .bind(entry.size as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query("DELETE FROM catalog_cache WHERE cache_key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn index(&self) -> Result<Vec<EntryMeta>, CacheError> {
        let rows: Vec<(String, i64, i64)> =
            sqlx::query_as("SELECT cache_key, stored_at, size_bytes FROM catalog_cache")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(key, stored_at, size)| EntryMeta {
                key,
                stored_at: from_millis(stored_at),
                size: size.max(0) as usize,
            })
            .collect())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM catalog_cache")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
