//! Elevation rasters as overlay tile sources.
//!
//! [`GeoRaster`] loads a single-band GeoTIFF (including Cloud-Optimized
//! GeoTIFFs) into memory and answers tile reads through the
//! [`ElevationSource`] trait. [`overlay_tile`] turns such a read into a
//! terrain-RGB [`PixelTile`](tile_common::PixelTile).

pub mod error;
pub mod geotiff;
pub mod overlay;
pub mod source;

pub use error::{ElevationError, Result};
pub use geotiff::{GeoRaster, GeoTransform, RasterCrs};
pub use overlay::overlay_tile;
pub use source::ElevationSource;
