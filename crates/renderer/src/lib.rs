//! Raster work for terrain tiles.
//!
//! - Image codec: decode upstream PNG/JPEG tiles, encode PNG responses
//! - Terrain-RGB elevation encoding
//! - Masked compositing of overlay tiles onto base tiles

pub mod composite;
pub mod decode;
pub mod png;
pub mod terrain_rgb;

pub use composite::merge;
pub use decode::decode_tile;
pub use png::encode_tile;
pub use terrain_rgb::TerrainRgb;
