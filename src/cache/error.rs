use thiserror::Error;

/// Failures inside a cache backend.
///
/// These never reach callers of [`super::CacheStore`]; the store logs them and
/// degrades to a miss (reads) or a no-op (writes).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
