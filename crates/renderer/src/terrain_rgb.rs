//! Terrain-RGB elevation encoding.
//!
//! An elevation `v` is quantized to `q = round((v - base) / interval)` and the
//! 24 bits of `q` are spread over the R, G and B bands, most significant byte
//! first. With the default base of -10000 m and interval of 0.1 m this covers
//! -10000 m up to roughly 1,667,721 m at decimeter resolution.

use rayon::prelude::*;
use tile_common::{PixelTile, RasterSample, RGB_BANDS};

/// Largest value representable in three 8-bit bands.
pub const MAX_QUANTIZED: u32 = (1 << 24) - 1;

/// Default elevation offset in meters.
pub const DEFAULT_BASE: f64 = -10000.0;

/// Default quantization step in meters.
pub const DEFAULT_INTERVAL: f64 = 0.1;

/// Minimum pixels to benefit from parallel encoding
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

/// Terrain-RGB encoding parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainRgb {
    /// Elevation that maps to `(0, 0, 0)`.
    pub base: f64,
    /// Elevation step per quantization unit.
    pub interval: f64,
    /// Number of least-significant bits of the quantized value to round away.
    /// Zero keeps full precision.
    pub round_digits: u32,
}

impl Default for TerrainRgb {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            interval: DEFAULT_INTERVAL,
            round_digits: 0,
        }
    }
}

impl TerrainRgb {
    /// Quantize one elevation, clamped to the 24-bit range.
    pub fn quantize(&self, elevation: f32) -> u32 {
        let mut q = (elevation as f64 - self.base) / self.interval;
        if self.round_digits > 0 {
            let step = 2f64.powi(self.round_digits as i32);
            q = (q / step).round() * step;
        } else {
            q = q.round();
        }
        q.clamp(0.0, MAX_QUANTIZED as f64) as u32
    }

    /// Split a quantized value into `[r, g, b]`.
    pub fn split(q: u32) -> [u8; 3] {
        [(q >> 16) as u8, (q >> 8) as u8, q as u8]
    }

    /// Recover the elevation encoded by an RGB triple.
    pub fn elevation(&self, r: u8, g: u8, b: u8) -> f64 {
        let q = (r as u32) * 65536 + (g as u32) * 256 + b as u32;
        self.base + self.interval * q as f64
    }

    /// Encode a masked elevation sample as a masked RGB tile.
    ///
    /// The input mask is carried over unchanged to all three bands. Masked
    /// pixels are written as `(0, 0, 0)`.
    pub fn encode(&self, sample: &RasterSample) -> PixelTile {
        let plane = sample.width * sample.height;

        let encode_pixel = |(&value, &masked): (&f32, &bool)| -> u32 {
            if masked {
                0
            } else {
                self.quantize(value)
            }
        };

        let quantized: Vec<u32> = if plane >= PARALLEL_THRESHOLD {
            sample
                .values
                .par_iter()
                .zip(sample.mask.par_iter())
                .map(encode_pixel)
                .collect()
        } else {
            sample
                .values
                .iter()
                .zip(sample.mask.iter())
                .map(encode_pixel)
                .collect()
        };

        let mut data = vec![0u8; plane * RGB_BANDS];
        for (i, &q) in quantized.iter().enumerate() {
            let [r, g, b] = Self::split(q);
            data[i] = r;
            data[plane + i] = g;
            data[2 * plane + i] = b;
        }

        // Lengths come from a validated RasterSample, so this cannot fail.
        PixelTile::new(sample.width, sample.height, data, sample.mask.clone())
            .unwrap_or_else(|| unreachable!("raster sample buffers match its dimensions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_encodes_to_black() {
        let enc = TerrainRgb::default();
        assert_eq!(TerrainRgb::split(enc.quantize(-10000.0)), [0, 0, 0]);
    }

    #[test]
    fn test_sea_level() {
        // (0 - -10000) / 0.1 = 100000 = 0x0186A0
        let enc = TerrainRgb::default();
        assert_eq!(enc.quantize(0.0), 100_000);
        assert_eq!(TerrainRgb::split(100_000), [0x01, 0x86, 0xA0]);
        assert!((enc.elevation(0x01, 0x86, 0xA0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamps_out_of_range() {
        let enc = TerrainRgb::default();
        assert_eq!(enc.quantize(-20000.0), 0);
        assert_eq!(enc.quantize(5_000_000.0), MAX_QUANTIZED);
    }

    #[test]
    fn test_round_digits() {
        let enc = TerrainRgb {
            round_digits: 4,
            ..TerrainRgb::default()
        };
        assert_eq!(enc.quantize(0.0) % 16, 0);
    }

    #[test]
    fn test_mask_is_broadcast() {
        let sample = RasterSample::new(2, 1, vec![100.0, f32::NAN], vec![false, true]).unwrap();
        let tile = TerrainRgb::default().encode(&sample);
        assert!(!tile.is_masked(0, 0));
        assert!(tile.is_masked(0, 1));
        assert_eq!(tile.pixel(0, 1), [0, 0, 0]);
        assert_eq!(tile.masked_count(), 1);
    }
}
