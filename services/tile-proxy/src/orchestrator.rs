//! Tile resolution: choose between the overlay, the base tile and a merge.
//!
//! For each request:
//! 1. If the upstream tile size is unknown, fetch the base tile once and
//!    record its size. That fetch is kept for the rest of the request.
//! 2. Read the overlay at that size. `OutsideBounds` means no overlay.
//! 3. No overlay: return the kept base tile, or redirect to the base URL.
//!    Fully valid overlay: return it without touching the upstream.
//!    Partially valid overlay: merge it onto the decoded base tile.
//!
//! Base fetch and decode failures surface as [`TileError::UpstreamUnavailable`]
//! and [`TileError::Decode`]. A base whose dimensions differ from the overlay's
//! is unusable and also reported as [`TileError::Decode`]. Overlay failures
//! other than `OutsideBounds` propagate unchanged.

use std::sync::Arc;

use bytes::Bytes;
use elevation::{overlay_tile, ElevationError};
use renderer::png::is_png;
use renderer::{decode_tile, encode_tile, merge};
use reqwest::Url;
use tile_common::{PixelTile, TileCoord, TileError};
use tracing::{debug, instrument, warn};

use crate::metrics::record_upstream_fetch;
use crate::request::TileRequest;
use crate::state::OverlayLayer;
use crate::tile_size::TileSizeState;
use crate::upstream::BaseTileFetcher;

/// Where the pixels of a PNG response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    Overlay,
    Merged,
    Base,
}

impl TileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileSource::Overlay => "overlay",
            TileSource::Merged => "merged",
            TileSource::Base => "base",
        }
    }
}

/// Result of resolving a tile request.
#[derive(Debug, Clone)]
pub enum TileOutcome {
    /// PNG bytes to return directly.
    Png { bytes: Bytes, source: TileSource },
    /// Send the client to the upstream tile instead.
    Redirect(Url),
}

/// A fetched and decoded base tile.
struct BaseTile {
    bytes: Bytes,
    pixels: PixelTile,
}

/// Resolves tile requests against the upstream and the overlay layers.
pub struct TileOrchestrator {
    fetcher: Arc<dyn BaseTileFetcher>,
    tile_size: Arc<TileSizeState>,
}

impl TileOrchestrator {
    pub fn new(fetcher: Arc<dyn BaseTileFetcher>, tile_size: Arc<TileSizeState>) -> Self {
        Self { fetcher, tile_size }
    }

    pub fn tile_size(&self) -> &TileSizeState {
        &self.tile_size
    }

    #[instrument(skip(self, request), fields(tile = %request.coord))]
    pub async fn resolve(&self, request: &TileRequest) -> Result<TileOutcome, TileError> {
        let mut base = None;

        let tile_size = match self.tile_size.get() {
            Some(size) => size,
            None => {
                let fetched = self.fetch_base(&request.base_url).await?;
                if fetched.pixels.width() != fetched.pixels.height() {
                    warn!(
                        width = fetched.pixels.width(),
                        height = fetched.pixels.height(),
                        "Upstream tile is not square; using its width"
                    );
                }
                let size = self.tile_size.establish(fetched.pixels.width() as u32);
                base = Some(fetched);
                size
            }
        };

        let overlay = match &request.overlay {
            Some(layer) => read_overlay(Arc::clone(layer), request.coord, tile_size).await?,
            None => None,
        };

        match overlay {
            None => match base {
                Some(base) => {
                    debug!("No overlay; returning probed base tile");
                    Ok(TileOutcome::Png {
                        bytes: base_as_png(base)?,
                        source: TileSource::Base,
                    })
                }
                None => {
                    debug!(url = %request.base_url, "No overlay; redirecting to upstream");
                    Ok(TileOutcome::Redirect(request.base_url.clone()))
                }
            },
            Some(tile) if tile.is_fully_valid() => {
                debug!("Overlay covers the whole tile");
                Ok(TileOutcome::Png {
                    bytes: encode_tile(&tile, false)?.into(),
                    source: TileSource::Overlay,
                })
            }
            Some(tile) => {
                let base = match base {
                    Some(base) => base,
                    None => self.fetch_base(&request.base_url).await?,
                };
                if base.pixels.width() != tile.width() || base.pixels.height() != tile.height() {
                    warn!(
                        base_width = base.pixels.width(),
                        base_height = base.pixels.height(),
                        tile_size,
                        url = %request.base_url,
                        "Base tile does not match the established tile size"
                    );
                    return Err(TileError::Decode(format!(
                        "base tile is {}x{}, expected {}x{}",
                        base.pixels.width(),
                        base.pixels.height(),
                        tile.width(),
                        tile.height()
                    )));
                }
                debug!(masked = tile.masked_count(), "Merging overlay onto base tile");
                let merged = merge(&base.pixels, &tile);
                Ok(TileOutcome::Png {
                    bytes: encode_tile(&merged, false)?.into(),
                    source: TileSource::Merged,
                })
            }
        }
    }

    async fn fetch_base(&self, url: &Url) -> Result<BaseTile, TileError> {
        let result = self.fetcher.fetch(url).await;
        record_upstream_fetch(result.is_ok());

        let bytes = result?;
        let pixels = decode_tile(&bytes)?;
        Ok(BaseTile { bytes, pixels })
    }
}

/// Read and encode the overlay on the blocking pool. `None` when the tile is
/// outside the layer.
async fn read_overlay(
    layer: Arc<OverlayLayer>,
    coord: TileCoord,
    tile_size: u32,
) -> Result<Option<PixelTile>, TileError> {
    let result = tokio::task::spawn_blocking(move || {
        overlay_tile(layer.source.as_ref(), coord, tile_size, &layer.encoding)
    })
    .await
    .map_err(|e| TileError::Internal(format!("overlay task failed: {}", e)))?;

    match result {
        Ok(tile) => Ok(Some(tile)),
        Err(ElevationError::OutsideBounds) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Upstream bytes if already PNG, otherwise the decoded pixels re-encoded.
fn base_as_png(base: BaseTile) -> Result<Bytes, TileError> {
    if is_png(&base.bytes) {
        Ok(base.bytes)
    } else {
        Ok(encode_tile(&base.pixels, false)?.into())
    }
}
