//! Common types and utilities shared across the terrain tile proxy crates.

pub mod bbox;
pub mod error;
pub mod raster;
pub mod tile;

pub use bbox::BoundingBox;
pub use error::TileError;
pub use raster::{PixelTile, RasterSample, RGB_BANDS};
pub use tile::{mercator_to_wgs84, wgs84_to_mercator, TileCoord, HALF_EARTH};
