//! Single-band GeoTIFF elevation rasters.

use std::collections::HashMap;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tile_common::{wgs84_to_mercator, BoundingBox};
use tracing::{debug, info};

use crate::{ElevationError, Result};

// GeoTIFF tag codes
const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_NODATA_TAG: u16 = 42113;

// GeoKey identifiers
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// EPSG codes treated as spherical Web Mercator.
const WEB_MERCATOR_CODES: [u16; 2] = [3857, 3785];

/// EPSG codes treated as plain lon/lat degrees.
const GEOGRAPHIC_CODES: [u16; 2] = [4326, 4269];

/// Coordinate reference system of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterCrs {
    /// EPSG:3857, meters
    WebMercator,
    /// EPSG:4326, degrees
    Geographic,
}

/// North-up affine georeferencing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X of the top-left corner of the top-left pixel
    pub origin_x: f64,
    /// Y of the top-left corner of the top-left pixel
    pub origin_y: f64,
    /// Pixel width in CRS units
    pub pixel_width: f64,
    /// Pixel height in CRS units (positive; rows run southwards)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Pixel `(col, row)` containing the CRS point, if inside a `width` x `height` grid.
    pub fn pixel_at(&self, x: f64, y: f64, width: usize, height: usize) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - y) / self.pixel_height).floor();

        if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
            return None;
        }

        Some((col as usize, row as usize))
    }
}

/// A single-band elevation raster held in memory.
#[derive(Debug)]
pub struct GeoRaster {
    /// Elevation data in row-major order (north to south, west to east).
    data: Vec<f32>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    crs: RasterCrs,
    /// Samples equal to this value are treated as missing.
    nodata: Option<f32>,
    /// Extent in Web Mercator meters.
    extent: BoundingBox,
}

impl GeoRaster {
    /// Build a raster from already-decoded parts.
    pub fn from_parts(
        data: Vec<f32>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        crs: RasterCrs,
        nodata: Option<f32>,
    ) -> Result<Self> {
        if data.len() != width * height {
            return Err(ElevationError::InvalidGeoTiff(format!(
                "{} samples for a {}x{} raster",
                data.len(),
                width,
                height
            )));
        }
        if transform.pixel_width <= 0.0 || transform.pixel_height <= 0.0 {
            return Err(ElevationError::InvalidGeoTiff(
                "pixel size must be positive".to_string(),
            ));
        }

        let extent = mercator_extent(&transform, crs, width, height);

        Ok(Self {
            data,
            width,
            height,
            transform,
            crs,
            nodata,
            extent,
        })
    }

    /// Load the first band of a GeoTIFF file.
    ///
    /// The whole band is decoded into memory as `f32`, so a raster costs
    /// `width * height * 4` bytes for the life of the process (about 1.6 GB
    /// for a 20000 x 20000 DEM). Clip large datasets to the served area
    /// before loading them. Files needing more than the decoder limits set
    /// here fail to load with a decode error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut decoder = Decoder::new(file)?;

        // Whole-raster reads of large DEMs exceed the default limits
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 2 * 1024 * 1024 * 1024; // 2 GB
        limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
        limits.ifd_value_size = 64 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        let geokeys = read_geokeys(&mut decoder)?;
        let crs = crs_from_geokeys(&geokeys)?;
        let mut transform = read_transform(&mut decoder)?;

        if geokeys.get(&GT_RASTER_TYPE) == Some(&RASTER_PIXEL_IS_POINT) {
            transform.origin_x -= transform.pixel_width / 2.0;
            transform.origin_y += transform.pixel_height / 2.0;
        }

        let nodata = read_nodata_value(&mut decoder);
        let data = decode_first_band(&mut decoder, width, height)?;

        let raster = Self::from_parts(data, width, height, transform, crs, nodata)?;

        info!(
            path = %path.display(),
            width,
            height,
            crs = ?crs,
            nodata = ?nodata,
            min_x = raster.extent.min_x,
            min_y = raster.extent.min_y,
            max_x = raster.extent.max_x,
            max_y = raster.extent.max_y,
            resident_mb = raster.resident_bytes() / (1024 * 1024),
            "Loaded elevation raster"
        );

        Ok(raster)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes held by the decoded band.
    pub fn resident_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn crs(&self) -> RasterCrs {
        self.crs
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Extent in Web Mercator meters.
    pub fn extent(&self) -> BoundingBox {
        self.extent
    }

    /// Sample at a pixel, `None` for no-data and non-finite values.
    pub fn value_at(&self, col: usize, row: usize) -> Option<f32> {
        let value = *self.data.get(row * self.width + col)?;
        if !value.is_finite() || Some(value) == self.nodata {
            return None;
        }
        Some(value)
    }
}

fn mercator_extent(
    transform: &GeoTransform,
    crs: RasterCrs,
    width: usize,
    height: usize,
) -> BoundingBox {
    let max_x = transform.origin_x + width as f64 * transform.pixel_width;
    let min_y = transform.origin_y - height as f64 * transform.pixel_height;

    match crs {
        RasterCrs::WebMercator => BoundingBox::new(transform.origin_x, min_y, max_x, transform.origin_y),
        RasterCrs::Geographic => {
            let (x0, y0) = wgs84_to_mercator(transform.origin_x, min_y);
            let (x1, y1) = wgs84_to_mercator(max_x, transform.origin_y);
            BoundingBox::new(x0, y0, x1, y1)
        }
    }
}

/// The tag for a GeoTIFF code, named or not, matching how the decoder keys its IFD.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Parse the GeoKey directory into `key -> value` for keys stored inline.
fn read_geokeys<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<HashMap<u16, u16>> {
    let directory = decoder
        .get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY_TAG))
        .map_err(|_| ElevationError::InvalidGeoTiff("missing GeoKeyDirectory".to_string()))?;

    if directory.len() < 4 {
        return Err(ElevationError::InvalidGeoTiff(
            "truncated GeoKeyDirectory header".to_string(),
        ));
    }

    let key_count = directory[3] as usize;
    let mut keys = HashMap::with_capacity(key_count);

    for entry in directory[4..].chunks_exact(4).take(key_count) {
        // [key id, tag location, count, value]; location 0 means the value is inline
        if entry[1] == 0 {
            keys.insert(entry[0], entry[3]);
        }
    }

    debug!(?keys, "Parsed GeoKeys");
    Ok(keys)
}

fn crs_from_geokeys(keys: &HashMap<u16, u16>) -> Result<RasterCrs> {
    if let Some(&code) = keys.get(&PROJECTED_CS_TYPE) {
        if WEB_MERCATOR_CODES.contains(&code) {
            return Ok(RasterCrs::WebMercator);
        }
        return Err(ElevationError::UnsupportedCrs(format!("EPSG:{}", code)));
    }

    let geographic_model = keys.get(&GT_MODEL_TYPE) == Some(&MODEL_TYPE_GEOGRAPHIC);
    match keys.get(&GEOGRAPHIC_TYPE) {
        Some(code) if GEOGRAPHIC_CODES.contains(code) => Ok(RasterCrs::Geographic),
        Some(code) => Err(ElevationError::UnsupportedCrs(format!("EPSG:{}", code))),
        None if geographic_model => Ok(RasterCrs::Geographic),
        None => Err(ElevationError::UnsupportedCrs(
            "no EPSG code in GeoKeyDirectory".to_string(),
        )),
    }
}

/// Read the pixel-to-model transform from ModelTransformation or
/// ModelPixelScale + ModelTiepoint.
fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION_TAG)) {
        if m.len() >= 16 {
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(ElevationError::InvalidGeoTiff(
                    "rotated rasters are not supported".to_string(),
                ));
            }
            return Ok(GeoTransform {
                origin_x: m[3],
                origin_y: m[7],
                pixel_width: m[0],
                pixel_height: -m[5],
            });
        }
    }

    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT_TAG));
    let pixel_scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE_TAG));

    match (tiepoint, pixel_scale) {
        (Ok(tiepoint), Ok(scale)) if tiepoint.len() >= 6 && scale.len() >= 2 => {
            // Tiepoint format: [i, j, k, x, y, z] maps raster (i, j) to model (x, y)
            Ok(GeoTransform {
                origin_x: tiepoint[3] - tiepoint[0] * scale[0],
                origin_y: tiepoint[4] + tiepoint[1] * scale[1],
                pixel_width: scale[0],
                pixel_height: scale[1],
            })
        }
        _ => Err(ElevationError::InvalidGeoTiff(
            "missing ModelTiepoint/ModelPixelScale".to_string(),
        )),
    }
}

/// Try to read the no-data value from the GDAL_NODATA tag.
fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA_TAG))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse().ok())
}

/// Decode the image and keep only the first band.
fn decode_first_band<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> Result<Vec<f32>> {
    let samples = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1).max(1) as usize;
    let planar = decoder.get_tag_u32(Tag::PlanarConfiguration).unwrap_or(1) == 2;

    let all: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    };

    let pixels = width * height;
    if samples == 1 {
        return Ok(all);
    }

    debug!(samples, planar, "Keeping first band of multi-band raster");
    if planar {
        Ok(all.into_iter().take(pixels).collect())
    } else {
        Ok(all.into_iter().step_by(samples).take(pixels).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(pairs: &[(u16, u16)]) -> HashMap<u16, u16> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_crs_from_projected_key() {
        assert_eq!(
            crs_from_geokeys(&keys(&[(GT_MODEL_TYPE, 1), (PROJECTED_CS_TYPE, 3857)])).unwrap(),
            RasterCrs::WebMercator
        );
        assert!(matches!(
            crs_from_geokeys(&keys(&[(PROJECTED_CS_TYPE, 32613)])),
            Err(ElevationError::UnsupportedCrs(_))
        ));
    }

    #[test]
    fn test_crs_from_geographic_key() {
        assert_eq!(
            crs_from_geokeys(&keys(&[(GT_MODEL_TYPE, 2), (GEOGRAPHIC_TYPE, 4326)])).unwrap(),
            RasterCrs::Geographic
        );
        assert_eq!(
            crs_from_geokeys(&keys(&[(GT_MODEL_TYPE, 2)])).unwrap(),
            RasterCrs::Geographic
        );
        assert!(crs_from_geokeys(&keys(&[(GT_MODEL_TYPE, 1)])).is_err());
    }

    #[test]
    fn test_pixel_at() {
        let t = GeoTransform {
            origin_x: 100.0,
            origin_y: 200.0,
            pixel_width: 10.0,
            pixel_height: 10.0,
        };
        assert_eq!(t.pixel_at(100.0, 200.0, 4, 4), Some((0, 0)));
        assert_eq!(t.pixel_at(139.9, 160.1, 4, 4), Some((3, 3)));
        assert_eq!(t.pixel_at(140.0, 190.0, 4, 4), None);
        assert_eq!(t.pixel_at(99.9, 190.0, 4, 4), None);
        assert_eq!(t.pixel_at(105.0, 200.1, 4, 4), None);
    }

    #[test]
    fn test_value_at_masks_nodata_and_nan() {
        let t = GeoTransform {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
        };
        let raster = GeoRaster::from_parts(
            vec![1.0, -9999.0, f32::NAN, f32::INFINITY],
            2,
            2,
            t,
            RasterCrs::WebMercator,
            Some(-9999.0),
        )
        .unwrap();
        assert_eq!(raster.value_at(0, 0), Some(1.0));
        assert_eq!(raster.value_at(1, 0), None);
        assert_eq!(raster.value_at(0, 1), None);
        assert_eq!(raster.value_at(1, 1), None);
        assert_eq!(raster.resident_bytes(), 16);
    }

    #[test]
    fn test_from_parts_validates() {
        let t = GeoTransform {
            origin_x: 0.0,
            origin_y: 0.0,
            pixel_width: 1.0,
            pixel_height: 1.0,
        };
        assert!(GeoRaster::from_parts(vec![0.0; 3], 2, 2, t, RasterCrs::WebMercator, None).is_err());
        let flipped = GeoTransform {
            pixel_height: -1.0,
            ..t
        };
        assert!(GeoRaster::from_parts(vec![0.0; 4], 2, 2, flipped, RasterCrs::WebMercator, None).is_err());
    }
}
