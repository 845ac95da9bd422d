//! Synthetic raster fixtures for terrain tile tests.
//!
//! GeoTIFF DEMs are written with the `tiff` encoder and carry the same tags a
//! GDAL-produced COG would: ModelPixelScale, ModelTiepoint, a GeoKey
//! directory and GDAL_NODATA.

use std::error::Error;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tile_common::{wgs84_to_mercator, TileCoord};

use crate::generators::elevation_grid;

/// Tile fully covered by [`DemFixture::around_tile`] fixtures in the tile tests.
pub const FIXTURE_TILE: TileCoord = TileCoord {
    z: 14,
    x: 8924,
    y: 9338,
};

/// Neighbour of [`FIXTURE_TILE`] that only overlaps the fixture's buffer.
pub const PARTIAL_TILE: TileCoord = TileCoord {
    z: 14,
    x: 8925,
    y: 9338,
};

/// Two columns east of [`FIXTURE_TILE`], entirely outside the fixture.
pub const OUTSIDE_TILE: TileCoord = TileCoord {
    z: 14,
    x: 8926,
    y: 9338,
};

/// Tile size the fixtures are built for.
pub const FIXTURE_TILE_SIZE: usize = 512;

/// Buffer in pixels around [`FIXTURE_TILE`].
pub const FIXTURE_BUFFER: usize = 30;

/// Coordinate reference system written into the GeoKey directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureCrs {
    /// EPSG:3857, coordinates in meters
    WebMercator,
    /// EPSG:4326, coordinates in degrees
    Geographic,
    /// A projected CRS the reader does not handle (EPSG:32613, UTM 13N)
    Utm13N,
}

/// An in-memory single-band DEM that can be written as a GeoTIFF.
#[derive(Debug, Clone)]
pub struct DemFixture {
    /// X of the top-left corner of the top-left pixel
    pub origin_x: f64,
    /// Y of the top-left corner of the top-left pixel
    pub origin_y: f64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    pub width: usize,
    pub height: usize,
    /// Row-major elevations, north row first
    pub values: Vec<f32>,
    pub nodata: Option<f32>,
    pub crs: FixtureCrs,
}

impl DemFixture {
    /// A Web Mercator DEM aligned to `coord`'s pixel grid at `tile_size`,
    /// covering the tile plus `buffer` pixels on every side.
    ///
    /// `elevation(col, row)` receives raster pixel indices.
    pub fn around_tile<F>(coord: TileCoord, tile_size: usize, buffer: usize, elevation: F) -> Self
    where
        F: Fn(usize, usize) -> f32,
    {
        let bounds = coord.mercator_bounds();
        let pixel = bounds.width() / tile_size as f64;
        let size = tile_size + 2 * buffer;

        let values = elevation_grid(size, size, elevation);

        Self {
            origin_x: bounds.min_x - buffer as f64 * pixel,
            origin_y: bounds.max_y + buffer as f64 * pixel,
            pixel_size_x: pixel,
            pixel_size_y: pixel,
            width: size,
            height: size,
            values,
            nodata: Some(-9999.0),
            crs: FixtureCrs::WebMercator,
        }
    }

    /// A geographic (EPSG:4326) DEM spanning the given lon/lat box.
    pub fn geographic(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
        width: usize,
        height: usize,
        values: Vec<f32>,
    ) -> Self {
        Self {
            origin_x: min_lon,
            origin_y: max_lat,
            pixel_size_x: (max_lon - min_lon) / width as f64,
            pixel_size_y: (max_lat - min_lat) / height as f64,
            width,
            height,
            values,
            nodata: None,
            crs: FixtureCrs::Geographic,
        }
    }

    /// Set every pixel in `cols` x `rows` to the no-data value.
    pub fn punch_nodata(
        &mut self,
        cols: std::ops::Range<usize>,
        rows: std::ops::Range<usize>,
    ) -> &mut Self {
        let nodata = self.nodata.unwrap_or(f32::NAN);
        for row in rows {
            for col in cols.clone() {
                self.values[row * self.width + col] = nodata;
            }
        }
        self
    }

    /// Web Mercator extent of a geographic fixture.
    pub fn mercator_extent(&self) -> (f64, f64, f64, f64) {
        let max_x = self.origin_x + self.width as f64 * self.pixel_size_x;
        let min_y = self.origin_y - self.height as f64 * self.pixel_size_y;
        match self.crs {
            FixtureCrs::Geographic => {
                let (x0, y0) = wgs84_to_mercator(self.origin_x, min_y);
                let (x1, y1) = wgs84_to_mercator(max_x, self.origin_y);
                (x0, y0, x1, y1)
            }
            _ => (self.origin_x, min_y, max_x, self.origin_y),
        }
    }

    fn geokeys(&self) -> Vec<u16> {
        // Header: version 1, revision 1.0, 3 keys
        let mut keys = vec![1, 1, 0, 3];
        match self.crs {
            FixtureCrs::WebMercator => keys.extend([1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, 3857]),
            FixtureCrs::Utm13N => keys.extend([1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, 32613]),
            FixtureCrs::Geographic => keys.extend([1024, 0, 1, 2, 1025, 0, 1, 1, 2048, 0, 1, 4326]),
        }
        keys
    }

    /// Write the fixture as a single-band Float32 GeoTIFF.
    pub fn write_geotiff(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let file = File::create(path)?;
        let mut encoder = TiffEncoder::new(file)?;
        let mut image =
            encoder.new_image::<colortype::Gray32Float>(self.width as u32, self.height as u32)?;

        let dir = image.encoder();
        dir.write_tag(
            Tag::from_u16_exhaustive(33550),
            &[self.pixel_size_x, self.pixel_size_y, 0.0][..],
        )?;
        dir.write_tag(
            Tag::from_u16_exhaustive(33922),
            &[0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0][..],
        )?;
        dir.write_tag(Tag::from_u16_exhaustive(34735), &self.geokeys()[..])?;
        if let Some(nodata) = self.nodata {
            dir.write_tag(Tag::from_u16_exhaustive(42113), nodata.to_string().as_str())?;
        }

        image.write_data(&self.values)?;
        Ok(())
    }

    /// Write the fixture into `dir` under `name`, returning the full path.
    pub fn write_into(&self, dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        self.write_geotiff(&path)
            .unwrap_or_else(|e| panic!("failed to write fixture {:?}: {}", path, e));
        path
    }
}

/// Encode a solid-colour RGB PNG tile.
pub fn solid_png_tile(size: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(size, size, image::Rgb(rgb));
    encode_image(image::DynamicImage::ImageRgb8(img), image::ImageOutputFormat::Png)
}

/// Encode a solid-colour JPEG tile.
pub fn solid_jpeg_tile(size: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(size, size, image::Rgb(rgb));
    encode_image(
        image::DynamicImage::ImageRgb8(img),
        image::ImageOutputFormat::Jpeg(95),
    )
}

fn encode_image(img: image::DynamicImage, format: image::ImageOutputFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, format)
        .expect("in-memory image encoding should not fail");
    bytes.into_inner()
}
