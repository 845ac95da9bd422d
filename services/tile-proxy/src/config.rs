//! Process configuration: command line / environment and overlay layer files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Terrain tile proxy
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-proxy")]
#[command(about = "Serves upstream map tiles composited with terrain-RGB elevation overlays")]
pub struct ProxyArgs {
    /// Upstream tile URL template with {z}, {x}, {y} and optional {ext} placeholders
    #[arg(long, env = "PROXY_TILE_LAYER")]
    pub tile_layer: String,

    /// Elevation GeoTIFF used as the default overlay
    #[arg(long, env = "OVERLAY_DATASET")]
    pub overlay_dataset: Option<PathBuf>,

    /// YAML file describing named overlay layers
    #[arg(long, env = "OVERLAY_LAYERS_CONFIG")]
    pub layers_config: Option<PathBuf>,

    /// Overlay layer used when a request does not select one
    #[arg(long, env = "OVERLAY_DEFAULT_LAYER")]
    pub default_layer: Option<String>,

    /// Extra hosts a request's `base_url` override may point at, comma separated.
    /// The host of `--tile-layer` is always allowed; `*` allows any host.
    #[arg(long, env = "BASE_URL_ALLOWED_HOSTS", value_delimiter = ',')]
    pub base_url_hosts: Vec<String>,

    /// Known upstream tile size in pixels; skips the size probe on the first request
    #[arg(long, env = "TILE_SIZE")]
    pub tile_size: Option<u32>,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 10, env = "UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: u64,

    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8000", env = "PROXY_LISTEN_ADDR")]
    pub listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Number of worker threads
    #[arg(long, env = "PROXY_WORKER_THREADS")]
    pub worker_threads: Option<usize>,
}

/// Named overlay layers loaded from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayersConfig {
    /// Layer used when a request does not name one.
    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub layers: Vec<LayerDefinition>,
}

/// One overlay layer backed by an elevation raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDefinition {
    /// Name used in the `layer` query parameter.
    pub name: String,

    /// Path to the elevation GeoTIFF.
    pub path: PathBuf,

    /// Low bits of the quantized elevation to round away.
    #[serde(default)]
    pub round_digits: u32,
}

impl LayersConfig {
    /// Load a layer file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layers config: {:?}", path))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse layers config: {:?}", path))?;

        tracing::info!(
            "Loaded {} overlay layer definitions from {:?}",
            config.layers.len(),
            path
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;

        for (i, layer) in config.layers.iter().enumerate() {
            if config.layers[..i].iter().any(|l| l.name == layer.name) {
                anyhow::bail!("duplicate overlay layer name '{}'", layer.name);
            }
        }
        Ok(config)
    }
}
