//! PNG encoding for tile pixel data.
//!
//! Supports two encoding modes:
//! - **RGB PNG (color type 2)**: Used for fully opaque tiles and whenever the
//!   mask is not persisted.
//! - **RGBA PNG (color type 6)**: Used when the mask is embedded as alpha.
//!
//! Use `encode_tile` to go straight from a [`PixelTile`].

use std::io::Write;

use tile_common::{PixelTile, TileError};

/// PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const COLOR_TYPE_RGB: u8 = 2;
const COLOR_TYPE_RGBA: u8 = 6;

/// Encode a tile as PNG.
///
/// With `include_mask = false` masked pixels are written with whatever sample
/// they hold; callers wanting transparency must clear them first or embed the
/// mask. With `include_mask = true` an alpha channel is written, 0 at masked
/// pixels and 255 elsewhere.
pub fn encode_tile(tile: &PixelTile, include_mask: bool) -> Result<Vec<u8>, TileError> {
    let (width, height) = (tile.width(), tile.height());
    let plane = width * height;
    let (red, green, blue) = (tile.band(0), tile.band(1), tile.band(2));

    let result = if include_mask {
        let mut pixels = Vec::with_capacity(plane * 4);
        for (i, &masked) in tile.mask().iter().enumerate() {
            let alpha = if masked { 0 } else { 255 };
            pixels.extend_from_slice(&[red[i], green[i], blue[i], alpha]);
        }
        create_png(&pixels, width, height)
    } else {
        let mut pixels = Vec::with_capacity(plane * 3);
        for i in 0..plane {
            pixels.extend_from_slice(&[red[i], green[i], blue[i]]);
        }
        create_png_rgb(&pixels, width, height)
    };

    result.map_err(TileError::Encode)
}

/// Check whether a byte buffer starts with the PNG signature.
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.len() >= PNG_SIGNATURE.len() && bytes[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
}

/// Create a PNG image from interleaved RGB pixel data (color type 2).
///
/// # Arguments
/// - `pixels`: RGB pixel data (3 bytes per pixel)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
pub fn create_png_rgb(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
    create_png_with_color_type(pixels, width, height, COLOR_TYPE_RGB, 3)
}

/// Create a PNG image from RGBA pixel data (color type 6).
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
pub fn create_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
    create_png_with_color_type(pixels, width, height, COLOR_TYPE_RGBA, 4)
}

fn create_png_with_color_type(
    pixels: &[u8],
    width: usize,
    height: usize,
    color_type: u8,
    bytes_per_pixel: usize,
) -> Result<Vec<u8>, String> {
    if pixels.len() != width * height * bytes_per_pixel {
        return Err(format!(
            "pixel buffer has {} bytes, expected {} for {}x{}",
            pixels.len(),
            width * height * bytes_per_pixel,
            width,
            height
        ));
    }

    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&PNG_SIGNATURE);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(color_type);
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    // IDAT chunk (image data)
    let idat_data = deflate_idat(pixels, width, height, bytes_per_pixel)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    // Write length
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());

    // Write chunk type
    png.extend_from_slice(chunk_type);

    // Write data
    png.extend_from_slice(data);

    // Write CRC
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate scanlines for the IDAT chunk.
///
/// Every scanline uses the Sub filter (type 1); terrain-RGB rows are smooth
/// gradients in the low byte.
fn deflate_idat(
    pixels: &[u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let row_bytes = width * bytes_per_pixel;
    let mut uncompressed = Vec::with_capacity(height * (1 + row_bytes));
    for y in 0..height {
        uncompressed.push(1); // filter type: sub
        let row = &pixels[y * row_bytes..(y + 1) * row_bytes];
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= bytes_per_pixel { row[i - bytes_per_pixel] } else { 0 };
            uncompressed.push(byte.wrapping_sub(left));
        }
    }

    // Compress with flate2
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    let compressed = encoder.finish()?;

    Ok(compressed)
}
