//! HTTP asset fetcher using reqwest.

use super::{AssetFetcher, PlatformError};
use async_trait::async_trait;
use std::time::Duration;

/// Fetches sprite candidates over HTTP.
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl Default for HttpAssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpAssetFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlatformError> {
        tracing::debug!("Fetching asset {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PlatformError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Fetch(format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlatformError::Fetch(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
