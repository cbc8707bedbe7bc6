//! Single-page HTTP access to the statistics collection.

use std::time::Duration;

use async_trait::async_trait;
use common::config::ApiConfig;
use common::Error;
use tracing::debug;

use crate::FeatureCollection;

/// One page query against the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub filter: String,
    pub limit: usize,
    pub offset: usize,
}

/// Fetches one page of features. Implementations map failures onto
/// `Error::Status`, `Error::Transport`, `Error::Json`, or `Error::Cancelled`
/// so the retry policy can classify them.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get_page(&self, request: &PageRequest) -> Result<FeatureCollection, Error>;
}

/// `reqwest`-backed transport with connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(api: &ApiConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(api.user_agent.as_str())
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api.base_url.clone(),
        })
    }
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn get_page(&self, request: &PageRequest) -> Result<FeatureCollection, Error> {
        debug!(
            "Fetching page: {} offset={} limit={}",
            self.base_url, request.offset, request.limit
        );

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("filter", request.filter.clone()),
                ("limit", request.limit.to_string()),
                ("offset", request.offset.to_string()),
                ("f", "json".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(serde_json::from_str(&body)?)
    }
}
