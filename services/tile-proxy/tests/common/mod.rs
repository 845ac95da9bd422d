//! Shared helpers for tile-proxy integration tests.
//!
//! Provides:
//! - A counting mock upstream
//! - Application state wired to a synthetic elevation fixture

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use elevation::GeoRaster;
use reqwest::Url;
use test_utils::{
    mountain_elevation, solid_png_tile, temp_test_dir, DemFixture, FIXTURE_BUFFER, FIXTURE_TILE,
    FIXTURE_TILE_SIZE,
};
use tile_common::{TileCoord, TileError};
use tile_proxy::orchestrator::TileOutcome;
use tile_proxy::request::TileRequest;
use tile_proxy::state::{AppState, OverlayLayer, OverlayRegistry};
use tile_proxy::tile_size::TileSizeState;
use tile_proxy::upstream::BaseTileFetcher;

/// Upstream URL template used by every test state.
pub const TEMPLATE: &str = "https://tiles.example.com/{z}/{x}/{y}.png";

/// Colour of the mock upstream's tiles.
pub const BASE_RGB: [u8; 3] = [10, 20, 30];

/// Name of the fixture overlay layer.
pub const LAYER: &str = "dem";

enum MockResponse {
    Tile(Bytes),
    ByHost { default: Bytes, hosts: Vec<(String, Bytes)> },
    Unavailable,
}

/// Upstream stand-in that records every request.
pub struct MockFetcher {
    response: MockResponse,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Serve `bytes` for every request.
    pub fn serving(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            response: MockResponse::Tile(Bytes::from(bytes)),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    /// Serve solid [`BASE_RGB`] PNG tiles of the fixture size.
    pub fn solid() -> Arc<Self> {
        Self::serving(solid_png_tile(FIXTURE_TILE_SIZE as u32, BASE_RGB))
    }

    /// Serve `default`, or the bytes listed for the request's host.
    pub fn by_host(default: Vec<u8>, hosts: &[(&str, Vec<u8>)]) -> Arc<Self> {
        Arc::new(Self {
            response: MockResponse::ByHost {
                default: Bytes::from(default),
                hosts: hosts
                    .iter()
                    .map(|(host, bytes)| (host.to_string(), Bytes::from(bytes.clone())))
                    .collect(),
            },
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    /// Fail every request as if the upstream were down.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: MockResponse::Unavailable,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseTileFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Bytes, TileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        // Let concurrent requests interleave
        tokio::task::yield_now().await;

        match &self.response {
            MockResponse::Tile(bytes) => Ok(bytes.clone()),
            MockResponse::ByHost { default, hosts } => Ok(hosts
                .iter()
                .find(|(host, _)| url.host_str() == Some(host.as_str()))
                .map(|(_, bytes)| bytes.clone())
                .unwrap_or_else(|| default.clone())),
            MockResponse::Unavailable => Err(TileError::UpstreamUnavailable(
                "upstream returned 503 Service Unavailable".to_string(),
            )),
        }
    }
}

/// A GeoRaster covering [`FIXTURE_TILE`] plus its buffer.
pub fn fixture_raster() -> GeoRaster {
    let dir = temp_test_dir();
    let fixture =
        DemFixture::around_tile(FIXTURE_TILE, FIXTURE_TILE_SIZE, FIXTURE_BUFFER, mountain_elevation);
    let path = fixture.write_into(dir.path(), "dem.tif");
    GeoRaster::from_file(&path).unwrap()
}

/// State with the fixture raster as default layer [`LAYER`].
pub fn fixture_app_state(fetcher: Arc<MockFetcher>, tile_size: TileSizeState) -> AppState {
    let mut overlays = OverlayRegistry::new();
    overlays.insert(OverlayLayer::new(LAYER, Arc::new(fixture_raster())));
    overlays.set_default(LAYER).unwrap();

    AppState::from_parts(TEMPLATE.to_string(), overlays, fetcher, tile_size)
}

pub fn fixture_state(fetcher: Arc<MockFetcher>, tile_size: TileSizeState) -> Arc<AppState> {
    Arc::new(fixture_app_state(fetcher, tile_size))
}

/// State sized for the fixture from the start.
pub fn seeded_state(fetcher: Arc<MockFetcher>) -> Arc<AppState> {
    fixture_state(fetcher, TileSizeState::seeded(FIXTURE_TILE_SIZE as u32))
}

pub fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Resolve `coord` with `pairs` as the query string.
pub async fn resolve(
    state: &AppState,
    coord: TileCoord,
    pairs: &[(&str, &str)],
) -> Result<TileOutcome, TileError> {
    let request = TileRequest::resolve(state, coord, Some("png"), query(pairs))?;
    state.orchestrator.resolve(&request).await
}
