use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::application::ports::ControllerLinkPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::record::RankingRecord;

/// Posts the ranking as JSON to a controller gateway.
pub struct HttpLink {
    client: reqwest::Client,
    url: String,
}

impl HttpLink {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> DomainResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(DomainError::InvalidInput("controller url is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| DomainError::Link(format!("building HTTP client for {url}: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ControllerLinkPort for HttpLink {
    async fn publish(&self, record: &RankingRecord) -> DomainResult<()> {
        let res = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| DomainError::Link(format!("POST {}: {e}", self.url)))?;
        let status = res.status();
        if !status.is_success() {
            return Err(DomainError::Link(format!("POST {} returned {status}", self.url)));
        }
        info!(url = %self.url, %status, "ranking posted");
        Ok(())
    }
}
