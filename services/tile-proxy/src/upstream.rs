//! Base tile fetching from the upstream tile server.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tile_common::TileError;
use tracing::{debug, instrument, warn};

/// Fetches encoded base tiles.
///
/// Forwarded query parameters are already part of `url`. Implementations do
/// not retry.
#[async_trait]
pub trait BaseTileFetcher: Send + Sync {
    /// GET `url`, failing with [`TileError::UpstreamUnavailable`] on transport
    /// errors and non-success statuses.
    async fn fetch(&self, url: &Url) -> Result<Bytes, TileError>;
}

/// [`BaseTileFetcher`] over a pooled `reqwest` client.
pub struct HttpTileFetcher {
    client: Client,
}

impl HttpTileFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(16)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl BaseTileFetcher for HttpTileFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<Bytes, TileError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(error = %e, "Upstream request failed");
            TileError::UpstreamUnavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Upstream returned non-success status");
            return Err(TileError::UpstreamUnavailable(format!(
                "upstream returned {}",
                status
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            warn!(error = %e, "Failed to read upstream body");
            TileError::UpstreamUnavailable(e.to_string())
        })?;

        debug!(bytes = bytes.len(), "Fetched base tile");
        Ok(bytes)
    }
}
