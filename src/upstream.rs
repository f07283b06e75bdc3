use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::time::{Duration, Instant};

use crate::config::Credential;
use crate::error::ProxyError;
use crate::metrics::UPSTREAM_LATENCY;
use crate::models::NormalizedQuery;

/// Outbound weather call. The payload is returned verbatim, it is never
/// parsed.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, query: &NormalizedQuery) -> Result<Bytes, ProxyError>;
}

// OpenWeather One Call over reqwest
#[derive(Debug, Clone)]
pub struct OpenWeatherFetcher {
    client: reqwest::Client,
    base_url: Url,
    credential: Credential,
}

impl OpenWeatherFetcher {
    pub fn new(
        base_url: Url,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            credential,
        })
    }
}

#[async_trait]
impl Fetcher for OpenWeatherFetcher {
    async fn fetch(&self, query: &NormalizedQuery) -> Result<Bytes, ProxyError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("lat", &query.lat)
            .append_pair("lon", &query.lon)
            .append_pair("exclude", &query.exclude)
            .append_pair("units", &query.units)
            .append_pair("appid", self.credential.expose());

        // latency covers failures and timeouts too
        let start = Instant::now();
        let result = self.get_body(url).await;
        UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

        if let Ok(body) = &result {
            tracing::debug!(bytes = body.len(), "Upstream responded");
        }
        result
    }
}

impl OpenWeatherFetcher {
    async fn get_body(&self, url: Url) -> Result<Bytes, ProxyError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ProxyError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            // upstream error bodies are never cached
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(ProxyError::from_body_read)
    }
}
