//! Error types for the elevation crate.

use thiserror::Error;
use tile_common::TileError;

/// Result type alias using ElevationError.
pub type Result<T> = std::result::Result<T, ElevationError>;

/// Errors that can occur when reading elevation rasters.
#[derive(Debug, Error)]
pub enum ElevationError {
    /// The requested tile footprint has no overlap with the raster extent.
    #[error("Tile footprint does not overlap the raster extent")]
    OutsideBounds,

    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or unusable georeferencing.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// The raster is in a coordinate system that would need reprojection.
    #[error("Unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    /// A tile size of zero was requested.
    #[error("Invalid tile size: {0}")]
    InvalidTileSize(u32),
}

impl From<ElevationError> for TileError {
    fn from(err: ElevationError) -> Self {
        match err {
            ElevationError::OutsideBounds => TileError::OutsideBounds,
            other => TileError::Overlay(other.to_string()),
        }
    }
}
