//! Tile reads from elevation sources.

use tile_common::{mercator_to_wgs84, BoundingBox, RasterSample, TileCoord};
use tracing::debug;

use crate::geotiff::{GeoRaster, RasterCrs};
use crate::{ElevationError, Result};

/// A source of elevation samples in the XYZ tile grid.
pub trait ElevationSource: Send + Sync {
    /// Read a `tile_size` x `tile_size` masked elevation sample for `coord`.
    ///
    /// Pixels without data are masked. Returns
    /// [`ElevationError::OutsideBounds`] when the tile does not touch the
    /// source at all.
    fn read_tile(&self, coord: TileCoord, tile_size: u32) -> Result<RasterSample>;

    /// Extent of the source in Web Mercator meters.
    fn bounds(&self) -> BoundingBox;
}

impl ElevationSource for GeoRaster {
    fn read_tile(&self, coord: TileCoord, tile_size: u32) -> Result<RasterSample> {
        if tile_size == 0 {
            return Err(ElevationError::InvalidTileSize(tile_size));
        }

        let footprint = coord.mercator_bounds();
        if footprint.intersection(&self.extent()).is_none() {
            return Err(ElevationError::OutsideBounds);
        }

        let size = tile_size as usize;
        let step_x = footprint.width() / size as f64;
        let step_y = footprint.height() / size as f64;
        let transform = *self.transform();

        let mut values = vec![0.0f32; size * size];
        let mut mask = vec![true; size * size];
        let mut covered = 0usize;

        // Nearest neighbour at output pixel centres
        for row in 0..size {
            let my = footprint.max_y - (row as f64 + 0.5) * step_y;
            for col in 0..size {
                let mx = footprint.min_x + (col as f64 + 0.5) * step_x;
                let (x, y) = match self.crs() {
                    RasterCrs::WebMercator => (mx, my),
                    RasterCrs::Geographic => mercator_to_wgs84(mx, my),
                };

                let Some((src_col, src_row)) = transform.pixel_at(x, y, self.width(), self.height())
                else {
                    continue;
                };
                covered += 1;

                if let Some(value) = self.value_at(src_col, src_row) {
                    let idx = row * size + col;
                    values[idx] = value;
                    mask[idx] = false;
                }
            }
        }

        // The extents can touch along an edge without any pixel centre inside
        if covered == 0 {
            return Err(ElevationError::OutsideBounds);
        }

        debug!(tile = %coord, tile_size, covered, "Read elevation tile");

        RasterSample::new(size, size, values, mask).ok_or_else(|| {
            ElevationError::InvalidGeoTiff("sample buffer does not match tile size".to_string())
        })
    }

    fn bounds(&self) -> BoundingBox {
        self.extent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotiff::GeoTransform;

    /// A 4x4 raster covering exactly tile 1/0/0.
    fn quadrant_raster(nodata_at: Option<usize>) -> GeoRaster {
        let bounds = TileCoord::new(1, 0, 0).mercator_bounds();
        let mut data: Vec<f32> = (0..16).map(|i| i as f32 * 10.0).collect();
        if let Some(i) = nodata_at {
            data[i] = -1.0;
        }
        GeoRaster::from_parts(
            data,
            4,
            4,
            GeoTransform {
                origin_x: bounds.min_x,
                origin_y: bounds.max_y,
                pixel_width: bounds.width() / 4.0,
                pixel_height: bounds.height() / 4.0,
            },
            RasterCrs::WebMercator,
            Some(-1.0),
        )
        .unwrap()
    }

    #[test]
    fn test_aligned_read_is_identity() {
        let raster = quadrant_raster(None);
        let sample = raster.read_tile(TileCoord::new(1, 0, 0), 4).unwrap();
        assert_eq!(sample.valid_count(), 16);
        assert_eq!(sample.values[5], 50.0);
        assert_eq!(sample.values[15], 150.0);
    }

    #[test]
    fn test_nodata_is_masked() {
        let raster = quadrant_raster(Some(6));
        let sample = raster.read_tile(TileCoord::new(1, 0, 0), 4).unwrap();
        assert!(sample.mask[6]);
        assert_eq!(sample.valid_count(), 15);
    }

    #[test]
    fn test_partial_overlap_masks_uncovered_pixels() {
        let raster = quadrant_raster(None);
        // Zoom 0 covers the whole world; the raster is its top-left quarter
        let sample = raster.read_tile(TileCoord::new(0, 0, 0), 4).unwrap();
        assert_eq!(sample.valid_count(), 4);
        assert!(!sample.mask[0]);
        assert!(!sample.mask[5]);
        assert!(sample.mask[2]);
        assert!(sample.mask[15]);
    }

    #[test]
    fn test_disjoint_tile_is_outside_bounds() {
        let raster = quadrant_raster(None);
        let result = raster.read_tile(TileCoord::new(1, 1, 1), 4);
        assert!(matches!(result, Err(ElevationError::OutsideBounds)));
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        let raster = quadrant_raster(None);
        assert!(matches!(
            raster.read_tile(TileCoord::new(1, 0, 0), 0),
            Err(ElevationError::InvalidTileSize(0))
        ));
    }
}
