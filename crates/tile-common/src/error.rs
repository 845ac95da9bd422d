//! Error types for the tile resolution pipeline.

use thiserror::Error;

/// Primary error type for tile resolution.
///
/// A base tile whose shape differs from the overlay's is reported as
/// [`TileError::Decode`] before compositing.
#[derive(Debug, Error)]
pub enum TileError {
    // === Overlay ===
    #[error("Tile lies outside the overlay extent")]
    OutsideBounds,

    #[error("Overlay layer not found: {0}")]
    LayerNotFound(String),

    #[error("Overlay read failed: {0}")]
    Overlay(String),

    // === Base tile ===
    #[error("Upstream tile unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    // === Output ===
    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TileError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::OutsideBounds
            | TileError::LayerNotFound(_)
            | TileError::UpstreamUnavailable(_)
            | TileError::Decode(_)
            | TileError::InvalidBaseUrl(_) => 404,

            TileError::Overlay(_) | TileError::Encode(_) | TileError::Internal(_) => 500,
        }
    }
}
