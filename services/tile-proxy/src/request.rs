//! Per-request configuration resolution.
//!
//! Control query parameters are consumed here and never reach the upstream:
//! `layer` selects the overlay (`none` disables it) and `base_url` replaces
//! the configured URL template. Everything else is forwarded in arrival order.
//! An override may only target the template's host or a configured extra host.

use std::sync::Arc;

use reqwest::Url;
use tile_common::{TileCoord, TileError};
use tracing::warn;

use crate::state::{AppState, OverlayLayer};

/// Query parameter selecting the overlay layer.
pub const LAYER_PARAM: &str = "layer";

/// Query parameter overriding the upstream URL template.
pub const BASE_URL_PARAM: &str = "base_url";

/// `layer` value that disables the overlay.
pub const NO_OVERLAY: &str = "none";

/// Extension substituted for `{ext}` when the request path has none.
pub const DEFAULT_EXTENSION: &str = "png";

/// Everything the orchestrator needs for one tile request.
#[derive(Debug, Clone)]
pub struct TileRequest {
    pub coord: TileCoord,
    /// Upstream URL with forwarded parameters appended.
    pub base_url: Url,
    pub overlay: Option<Arc<OverlayLayer>>,
}

impl TileRequest {
    /// Resolve a request for `coord` against the process state.
    ///
    /// `ext` is the extension from the request path, if any.
    pub fn resolve(
        state: &AppState,
        coord: TileCoord,
        ext: Option<&str>,
        query: Vec<(String, String)>,
    ) -> Result<Self, TileError> {
        let mut layer = None;
        let mut template = None;
        let mut forwarded = Vec::with_capacity(query.len());

        for (key, value) in query {
            match key.as_str() {
                LAYER_PARAM => layer = Some(value),
                BASE_URL_PARAM => template = Some(value),
                _ => forwarded.push((key, value)),
            }
        }

        let overlay = match layer.as_deref() {
            None => state.overlays.default_layer(),
            Some(NO_OVERLAY) => None,
            Some(name) => Some(
                state
                    .overlays
                    .get(name)
                    .ok_or_else(|| TileError::LayerNotFound(name.to_string()))?,
            ),
        };

        let base_url = resolve_base_url(
            template.as_deref().unwrap_or(&state.base_template),
            coord,
            ext.unwrap_or(DEFAULT_EXTENSION),
            &forwarded,
        )?;
        if template.is_some() && !state.allows_base_url(&base_url) {
            warn!(host = ?base_url.host_str(), "Rejected base_url override");
            return Err(TileError::InvalidBaseUrl(format!(
                "host {:?} is not allowed",
                base_url.host_str()
            )));
        }

        Ok(Self {
            coord,
            base_url,
            overlay,
        })
    }
}

/// Substitute `coord` and `ext` into `template` and append `forwarded`.
pub fn resolve_base_url(
    template: &str,
    coord: TileCoord,
    ext: &str,
    forwarded: &[(String, String)],
) -> Result<Url, TileError> {
    let resolved = template
        .replace("{z}", &coord.z.to_string())
        .replace("{x}", &coord.x.to_string())
        .replace("{y}", &coord.y.to_string())
        .replace("{ext}", ext);

    let mut url =
        Url::parse(&resolved).map_err(|e| TileError::InvalidBaseUrl(format!("{}: {}", resolved, e)))?;

    if !forwarded.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in forwarded {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}
