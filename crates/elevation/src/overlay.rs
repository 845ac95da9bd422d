//! Terrain-RGB overlay tiles.

use renderer::TerrainRgb;
use tile_common::{PixelTile, TileCoord};

use crate::{ElevationSource, Result};

/// Read `coord` from `source` and encode it as a masked terrain-RGB tile.
///
/// Fails with [`ElevationError::OutsideBounds`](crate::ElevationError::OutsideBounds)
/// when the tile lies entirely outside the source. Pixels without elevation
/// are masked in the returned tile.
pub fn overlay_tile(
    source: &dyn ElevationSource,
    coord: TileCoord,
    tile_size: u32,
    encoding: &TerrainRgb,
) -> Result<PixelTile> {
    let sample = source.read_tile(coord, tile_size)?;
    Ok(encoding.encode(&sample))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElevationError;
    use tile_common::{BoundingBox, RasterSample};

    struct FlatSource {
        elevation: f32,
    }

    impl ElevationSource for FlatSource {
        fn read_tile(&self, coord: TileCoord, tile_size: u32) -> Result<RasterSample> {
            if coord.z == 0 {
                return Err(ElevationError::OutsideBounds);
            }
            let n = (tile_size * tile_size) as usize;
            Ok(RasterSample::new(
                tile_size as usize,
                tile_size as usize,
                vec![self.elevation; n],
                vec![false; n],
            )
            .unwrap())
        }

        fn bounds(&self) -> BoundingBox {
            BoundingBox::new(0.0, 0.0, 1.0, 1.0)
        }
    }

    #[test]
    fn test_flat_source_encodes_uniformly() {
        let source = FlatSource { elevation: 0.0 };
        let tile = overlay_tile(&source, TileCoord::new(3, 1, 1), 8, &TerrainRgb::default()).unwrap();
        assert_eq!(tile.shape(), (3, 8, 8));
        assert!(tile.is_fully_valid());
        assert_eq!(tile.pixel(7, 7), [0x01, 0x86, 0xA0]);
    }

    #[test]
    fn test_outside_bounds_propagates() {
        let source = FlatSource { elevation: 0.0 };
        let result = overlay_tile(&source, TileCoord::new(0, 0, 0), 8, &TerrainRgb::default());
        assert!(matches!(result, Err(ElevationError::OutsideBounds)));
    }
}
