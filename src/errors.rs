use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize, Clone, PartialEq)]
#[serde(tag = "type", content = "message")]
pub enum NextUpError {
    /// Connection reset, DNS failure, TLS failure and friends.
    #[error("Network error: {0}")]
    Network(String),

    /// A single attempt ran past the configured request timeout.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// The caller's deadline passed; remaining retries were skipped.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limited by provider (HTTP 429)")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl NextUpError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, timeouts, 429 and 5xx are transient. Every other
    /// status is a permanent request error and is surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            NextUpError::Network(_) | NextUpError::Timeout(_) | NextUpError::RateLimited => true,
            NextUpError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classify a non-2xx status code.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => NextUpError::RateLimited,
            404 => NextUpError::NotFound(truncate(body, 200)),
            _ => NextUpError::Http {
                status,
                body: truncate(body, 200),
            },
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl From<reqwest::Error> for NextUpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            NextUpError::Timeout(0)
        } else {
            NextUpError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for NextUpError {
    fn from(e: serde_json::Error) -> Self {
        NextUpError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NextUpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(NextUpError::Network("reset".into()).is_retryable());
        assert!(NextUpError::Timeout(10).is_retryable());
        assert!(NextUpError::from_status(429, "").is_retryable());
        assert!(NextUpError::from_status(503, "busy").is_retryable());

        assert!(!NextUpError::from_status(404, "").is_retryable());
        assert!(!NextUpError::from_status(401, "bad key").is_retryable());
        assert!(!NextUpError::DeadlineExceeded.is_retryable());
        assert!(!NextUpError::Parse("eof".into()).is_retryable());
    }

    #[test]
    fn test_status_body_is_truncated() {
        let body = "x".repeat(500);
        match NextUpError::from_status(500, &body) {
            NextUpError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), 203);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_serializes_tagged() {
        let json = serde_json::to_value(NextUpError::Config("bad".into())).unwrap();
        assert_eq!(json["type"], "Config");
        assert_eq!(json["message"], "bad");
    }
}
