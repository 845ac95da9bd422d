//! Decoding of upstream tile images.

use image::GenericImageView;
use tile_common::{PixelTile, TileError, RGB_BANDS};
use tracing::debug;

/// Decode PNG or JPEG bytes into a band-major RGB tile.
///
/// Any alpha channel is dropped and the result is treated as fully opaque.
pub fn decode_tile(bytes: &[u8]) -> Result<PixelTile, TileError> {
    let img = image::load_from_memory(bytes).map_err(|e| TileError::Decode(e.to_string()))?;
    let (width, height) = img.dimensions();
    let (width, height) = (width as usize, height as usize);
    debug!(width, height, color = ?img.color(), "Decoded tile image");

    let rgb = img.to_rgb8();
    let plane = width * height;
    let mut data = vec![0u8; plane * RGB_BANDS];

    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = pixel[0];
        data[plane + i] = pixel[1];
        data[2 * plane + i] = pixel[2];
    }

    PixelTile::opaque(width, height, data)
        .ok_or_else(|| TileError::Decode(format!("inconsistent {}x{} image buffer", width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::create_png;

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_tile(b"definitely not an image").unwrap_err();
        assert!(matches!(err, TileError::Decode(_)));
    }

    #[test]
    fn test_decode_drops_alpha() {
        // 2x1 RGBA: opaque red, fully transparent green
        let png = create_png(&[255, 0, 0, 255, 0, 255, 0, 0], 2, 1).unwrap();
        let tile = decode_tile(&png).unwrap();
        assert_eq!(tile.shape(), (3, 1, 2));
        assert_eq!(tile.pixel(0, 0), [255, 0, 0]);
        assert_eq!(tile.pixel(0, 1), [0, 255, 0]);
        assert!(tile.is_fully_valid());
    }
}
