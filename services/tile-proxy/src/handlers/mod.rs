//! HTTP request handlers.

pub mod health;
pub mod tiles;

pub use health::{health_handler, metrics_handler};
pub use tiles::xyz_tile_handler;
