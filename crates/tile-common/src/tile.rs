//! XYZ tile coordinates and Web Mercator tile geometry.
//!
//! Tiles follow the standard slippy-map pyramid: origin at the top-left,
//! `2^z` tiles per axis, EPSG:3857 footprint.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Half the earth's circumference in Web Mercator meters.
pub const HALF_EARTH: f64 = 20037508.342789244;

/// Latitude limit of the Web Mercator square.
const MAX_MERCATOR_LAT: f64 = 85.05112878;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Whether x and y fall inside the `2^z` grid of this zoom level.
    pub fn is_valid(&self) -> bool {
        if self.z >= 32 {
            return false;
        }
        let n = 1u64 << self.z;
        (self.x as u64) < n && (self.y as u64) < n
    }

    /// Footprint of this tile in EPSG:3857 meters.
    pub fn mercator_bounds(&self) -> BoundingBox {
        let span = 2.0 * HALF_EARTH / 2f64.powi(self.z as i32);

        let min_x = -HALF_EARTH + self.x as f64 * span;
        let max_y = HALF_EARTH - self.y as f64 * span;

        BoundingBox::new(min_x, max_y - span, min_x + span, max_y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert Web Mercator (EPSG:3857) coordinates to WGS84 (EPSG:4326) lon/lat.
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / HALF_EARTH) * 180.0;
    let lat = (y / HALF_EARTH) * 180.0;
    let lat = 180.0 / PI * (2.0 * (lat * PI / 180.0).exp().atan() - PI / 2.0);
    (lon, lat)
}

/// Convert WGS84 lon/lat to Web Mercator meters. Latitude is clamped to the
/// Web Mercator square.
pub fn wgs84_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = lon * HALF_EARTH / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    (x, y * HALF_EARTH / 180.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_zero_covers_world() {
        let b = TileCoord::new(0, 0, 0).mercator_bounds();
        assert!((b.min_x + HALF_EARTH).abs() < 1e-6);
        assert!((b.max_x - HALF_EARTH).abs() < 1e-6);
        assert!((b.min_y + HALF_EARTH).abs() < 1e-6);
        assert!((b.max_y - HALF_EARTH).abs() < 1e-6);
    }

    #[test]
    fn test_adjacent_tiles_share_edges() {
        let a = TileCoord::new(14, 8924, 9338).mercator_bounds();
        let b = TileCoord::new(14, 8925, 9338).mercator_bounds();
        assert!((a.max_x - b.min_x).abs() < 1e-6);
    }

    #[test]
    fn test_is_valid() {
        assert!(TileCoord::new(0, 0, 0).is_valid());
        assert!(!TileCoord::new(0, 1, 0).is_valid());
        assert!(TileCoord::new(14, 16383, 16383).is_valid());
        assert!(!TileCoord::new(14, 16384, 0).is_valid());
    }

    #[test]
    fn test_wgs84_roundtrip() {
        let (x, y) = wgs84_to_mercator(-105.27, 40.01);
        let (lon, lat) = mercator_to_wgs84(x, y);
        assert!((lon + 105.27).abs() < 1e-6);
        assert!((lat - 40.01).abs() < 1e-6);
    }

    #[test]
    fn test_display() {
        assert_eq!(TileCoord::new(14, 8924, 9338).to_string(), "14/8924/9338");
    }
}
