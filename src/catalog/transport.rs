use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::errors::{NextUpError, Result};

const USER_AGENT: &str = "nextup/0.1 (backlog ranker)";

/// Raw outcome of one GET, before status classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The single outbound call the fetch pipeline wraps.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<TransportResponse>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogTransport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<TransportResponse> {
        let url = reqwest::Url::parse_with_params(url, params)
            .map_err(|e| NextUpError::Config(format!("URL parse error: {}", e)))?;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify(e, timeout))?;

        Ok(TransportResponse { status, body })
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> NextUpError {
    if e.is_timeout() {
        NextUpError::Timeout(timeout.as_millis() as u64)
    } else {
        NextUpError::Network(e.to_string())
    }
}
