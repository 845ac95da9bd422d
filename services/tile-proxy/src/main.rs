//! Terrain Tile Proxy Server
//!
//! Proxies an upstream XYZ tile layer, substituting or compositing terrain-RGB
//! tiles rendered from local elevation rasters.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tile_proxy::config::ProxyArgs;
use tile_proxy::state::AppState;

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = ProxyArgs::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: ProxyArgs) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = tile_proxy::metrics::install_recorder()?;
    info!("Prometheus metrics exporter initialized");
    info!(template = %args.tile_layer, "Starting terrain tile proxy");

    // Raster loading reads whole files
    let state = {
        let args = args.clone();
        tokio::task::spawn_blocking(move || AppState::new(&args, Some(prometheus_handle)))
            .await
            .context("State initialization task failed")??
    };
    let state = Arc::new(state);

    if state.overlays.is_empty() {
        warn!("No overlay layers configured; tiles will redirect to the upstream");
    }
    if let Some(size) = state.orchestrator.tile_size().get() {
        info!(tile_size = size, "Using configured tile size");
    }

    let app = tile_proxy::router(state);

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!("Tile proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;

    Ok(())
}
