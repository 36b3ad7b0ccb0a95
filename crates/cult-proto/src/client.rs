//! HTTP client for the station status endpoint.

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;
use crate::status::StationStatus;

/// Anything that can produce a fresh [`StationStatus`].
///
/// The poller only talks to this trait, so tests drive it with scripted
/// sources instead of a live endpoint.
#[async_trait]
pub trait StatusSource: Send + Sync + 'static {
    async fn fetch_status(&self) -> Result<StationStatus, FetchError>;
}

/// Decode a response body.  Shape mismatches surface as `FetchError::Decode`.
pub fn decode_status(body: &[u8]) -> Result<StationStatus, FetchError> {
    Ok(serde_json::from_slice(body)?)
}

#[derive(Debug, Clone)]
pub struct StatusClient {
    client: Client,
    status_url: Url,
}

impl StatusClient {
    /// Build the status URL from `api_base` and `station_id`, reusing a
    /// shared `reqwest::Client`.
    pub fn new(client: Client, api_base: &str, station_id: &str) -> anyhow::Result<Self> {
        let base = api_base.trim_end_matches('/');
        let status_url = Url::parse(&format!("{}/stations/{}/status", base, station_id))?;
        Ok(Self { client, status_url })
    }

    pub fn from_config(client: Client, config: &Config) -> anyhow::Result<Self> {
        Self::new(client, &config.station.api_base, &config.station.station_id)
    }

    /// Status URL without the cache buster.
    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    /// URL for one request: `?v=<unix millis>` defeats intermediate caches.
    fn request_url(&self) -> Url {
        let mut url = self.status_url.clone();
        let buster = chrono::Utc::now().timestamp_millis();
        url.query_pairs_mut()
            .append_pair("v", &buster.to_string());
        url
    }

    pub async fn fetch_status(&self) -> Result<StationStatus, FetchError> {
        let url = self.request_url();
        debug!("[status] GET {}", url);
        let resp = self.client.get(url).send().await?;
        let code = resp.status();
        if !code.is_success() {
            return Err(FetchError::Status(code.as_u16()));
        }
        let body = resp.bytes().await?;
        debug!("[status] {} bytes", body.len());
        decode_status(&body)
    }
}

#[async_trait]
impl StatusSource for StatusClient {
    async fn fetch_status(&self) -> Result<StationStatus, FetchError> {
        StatusClient::fetch_status(self).await
    }
}
