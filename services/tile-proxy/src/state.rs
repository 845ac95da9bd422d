//! Application state for the tile proxy.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use elevation::{ElevationSource, GeoRaster};
use metrics_exporter_prometheus::PrometheusHandle;
use renderer::TerrainRgb;
use reqwest::Url;
use tracing::info;

use crate::config::{LayerDefinition, LayersConfig, ProxyArgs};
use crate::orchestrator::TileOrchestrator;
use crate::tile_size::TileSizeState;
use crate::upstream::{BaseTileFetcher, HttpTileFetcher};

/// Name given to the `OVERLAY_DATASET` layer when no default name is configured.
pub const DATASET_LAYER_NAME: &str = "default";

/// An elevation source served as a terrain-RGB overlay.
pub struct OverlayLayer {
    pub name: String,
    pub source: Arc<dyn ElevationSource>,
    pub encoding: TerrainRgb,
}

impl OverlayLayer {
    pub fn new(name: impl Into<String>, source: Arc<dyn ElevationSource>) -> Self {
        Self {
            name: name.into(),
            source,
            encoding: TerrainRgb::default(),
        }
    }
}

impl std::fmt::Debug for OverlayLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayLayer")
            .field("name", &self.name)
            .field("bounds", &self.source.bounds())
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Overlay layers by name, plus the layer used when a request names none.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    layers: HashMap<String, Arc<OverlayLayer>>,
    default: Option<String>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: OverlayLayer) {
        self.layers.insert(layer.name.clone(), Arc::new(layer));
    }

    /// Set the default layer; it must already be registered.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.layers.contains_key(name) {
            anyhow::bail!("default overlay layer '{}' is not configured", name);
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<OverlayLayer>> {
        self.layers.get(name).cloned()
    }

    pub fn default_layer(&self) -> Option<Arc<OverlayLayer>> {
        self.default.as_deref().and_then(|name| self.get(name))
    }

    /// Layer names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Load the layers named by the process configuration.
    ///
    /// The default is `OVERLAY_DEFAULT_LAYER` if set, then the layer file's
    /// `default`, then the `OVERLAY_DATASET` layer.
    pub fn load(args: &ProxyArgs) -> Result<Self> {
        let mut registry = Self::new();
        let mut default = None;

        if let Some(path) = &args.layers_config {
            let config = LayersConfig::load(path)?;
            for definition in &config.layers {
                registry.insert(load_layer(definition)?);
            }
            default = config.default;
        }

        if let Some(path) = &args.overlay_dataset {
            let name = args
                .default_layer
                .clone()
                .filter(|name| !registry.layers.contains_key(name))
                .unwrap_or_else(|| DATASET_LAYER_NAME.to_string());
            registry.insert(load_layer(&LayerDefinition {
                name: name.clone(),
                path: path.clone(),
                round_digits: 0,
            })?);
            default = default.or(Some(name));
        }

        if let Some(name) = args.default_layer.clone().or(default) {
            registry.set_default(&name)?;
        }

        info!(
            layers = ?registry.names(),
            default = ?registry.default,
            "Overlay layers ready"
        );
        Ok(registry)
    }
}

fn load_layer(definition: &LayerDefinition) -> Result<OverlayLayer> {
    let raster = GeoRaster::from_file(&definition.path).with_context(|| {
        format!(
            "Failed to load overlay layer '{}' from {:?}",
            definition.name, definition.path
        )
    })?;

    Ok(OverlayLayer {
        name: definition.name.clone(),
        source: Arc::new(raster),
        encoding: TerrainRgb {
            round_digits: definition.round_digits,
            ..TerrainRgb::default()
        },
    })
}

/// Shared application state.
pub struct AppState {
    /// Upstream URL template used when a request does not override it.
    pub base_template: String,

    pub overlays: OverlayRegistry,

    /// Hosts a `base_url` override may target besides the template's own.
    pub base_url_hosts: Vec<String>,

    pub orchestrator: TileOrchestrator,

    /// Renders `/metrics`; absent when no recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create the state from process configuration.
    pub fn new(args: &ProxyArgs, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        let overlays = OverlayRegistry::load(args)?;
        let fetcher = HttpTileFetcher::new(Duration::from_secs(args.upstream_timeout_secs))?;
        let tile_size = args
            .tile_size
            .map(TileSizeState::seeded)
            .unwrap_or_default();

        let mut state = Self::from_parts(
            args.tile_layer.clone(),
            overlays,
            Arc::new(fetcher),
            tile_size,
        );
        state.prometheus = prometheus;
        Ok(state.with_base_url_hosts(args.base_url_hosts.clone()))
    }

    /// Assemble the state from already-built parts.
    pub fn from_parts(
        base_template: String,
        overlays: OverlayRegistry,
        fetcher: Arc<dyn BaseTileFetcher>,
        tile_size: TileSizeState,
    ) -> Self {
        Self {
            base_template,
            overlays,
            base_url_hosts: Vec::new(),
            orchestrator: TileOrchestrator::new(fetcher, Arc::new(tile_size)),
            prometheus: None,
        }
    }

    pub fn with_base_url_hosts(mut self, hosts: Vec<String>) -> Self {
        self.base_url_hosts = hosts;
        self
    }

    /// Whether a `base_url` override may send requests to `url`.
    pub fn allows_base_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.base_url_hosts.iter().any(|h| h == "*" || h.eq_ignore_ascii_case(host)) {
            return true;
        }
        template_host(&self.base_template).is_some_and(|h| h.eq_ignore_ascii_case(host))
    }
}

fn template_host(template: &str) -> Option<String> {
    let probe = template
        .replace("{z}", "0")
        .replace("{x}", "0")
        .replace("{y}", "0")
        .replace("{ext}", "png");
    Url::parse(&probe).ok()?.host_str().map(str::to_string)
}
