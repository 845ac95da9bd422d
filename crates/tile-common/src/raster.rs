//! Masked pixel containers.
//!
//! Samples and validity masks are kept in two parallel vectors. A mask entry
//! of `true` marks the pixel invalid (transparent); masks are per pixel and
//! apply to every band.

/// Number of bands in an RGB tile.
pub const RGB_BANDS: usize = 3;

/// A band-major 8-bit RGB tile with a per-pixel validity mask.
///
/// Sample `(band, row, col)` lives at `band * height * width + row * width + col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelTile {
    width: usize,
    height: usize,
    data: Vec<u8>,
    mask: Vec<bool>,
}

impl PixelTile {
    /// Build a tile from band-major samples and a per-pixel mask.
    ///
    /// Returns `None` when the buffer lengths do not match the dimensions.
    pub fn new(width: usize, height: usize, data: Vec<u8>, mask: Vec<bool>) -> Option<Self> {
        let pixels = width * height;
        if data.len() != pixels * RGB_BANDS || mask.len() != pixels {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
            mask,
        })
    }

    /// Build a fully valid tile.
    pub fn opaque(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        Self::new(width, height, data, vec![false; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        RGB_BANDS
    }

    /// `(bands, height, width)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (RGB_BANDS, self.height, self.width)
    }

    /// Band-major samples.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Per-pixel mask in row-major order, `true` = invalid.
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Samples of a single band in row-major order.
    pub fn band(&self, band: usize) -> &[u8] {
        let plane = self.width * self.height;
        &self.data[band * plane..(band + 1) * plane]
    }

    pub fn sample(&self, band: usize, row: usize, col: usize) -> u8 {
        self.data[band * self.width * self.height + row * self.width + col]
    }

    /// RGB triple at a pixel.
    pub fn pixel(&self, row: usize, col: usize) -> [u8; 3] {
        [
            self.sample(0, row, col),
            self.sample(1, row, col),
            self.sample(2, row, col),
        ]
    }

    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.mask[row * self.width + col]
    }

    /// Two tiles are compatible when band count, height and width all match.
    pub fn is_compatible(&self, other: &PixelTile) -> bool {
        self.shape() == other.shape()
    }

    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// True when no pixel is masked.
    pub fn is_fully_valid(&self) -> bool {
        !self.mask.iter().any(|&m| m)
    }

    pub fn has_valid_pixels(&self) -> bool {
        self.mask.iter().any(|&m| !m)
    }

    /// A copy with every masked sample zeroed. The mask itself is kept.
    pub fn with_masked_cleared(&self) -> PixelTile {
        let plane = self.width * self.height;
        let mut data = self.data.clone();
        for (i, &masked) in self.mask.iter().enumerate() {
            if masked {
                for band in 0..RGB_BANDS {
                    data[band * plane + i] = 0;
                }
            }
        }
        PixelTile {
            width: self.width,
            height: self.height,
            data,
            mask: self.mask.clone(),
        }
    }
}

/// A single-band floating point elevation array with a validity mask.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSample {
    pub width: usize,
    pub height: usize,
    /// Row-major values; contents at masked positions are unspecified.
    pub values: Vec<f32>,
    /// Row-major mask, `true` = no data.
    pub mask: Vec<bool>,
}

impl RasterSample {
    /// Returns `None` when the buffer lengths do not match the dimensions.
    pub fn new(width: usize, height: usize, values: Vec<f32>, mask: Vec<bool>) -> Option<Self> {
        if values.len() != width * height || mask.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            values,
            mask,
        })
    }

    /// A sample where every pixel is masked.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
            mask: vec![true; width * height],
        }
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| !m).count()
    }
}
