//! Terrain tile proxy service library.
//!
//! Serves XYZ tiles from an upstream tile server, replacing or compositing
//! them with terrain-RGB tiles rendered from local elevation rasters.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod orchestrator;
pub mod request;
pub mod state;
pub mod tile_size;
pub mod upstream;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tiles/:z/:x/:y", get(handlers::xyz_tile_handler))
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
