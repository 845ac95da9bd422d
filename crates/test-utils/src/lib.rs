//! Test support for the terrain tile proxy crates.
//!
//! Synthetic GeoTIFF DEMs laid out around a known XYZ tile, solid base tiles
//! as PNG/JPEG bytes, deterministic elevation surfaces, and helpers for
//! optional real-data tests.
//!
//! ```ignore
//! use test_utils::{mountain_elevation, DemFixture, FIXTURE_BUFFER, FIXTURE_TILE, FIXTURE_TILE_SIZE};
//!
//! let dir = test_utils::temp_test_dir();
//! let dem = DemFixture::around_tile(FIXTURE_TILE, FIXTURE_TILE_SIZE, FIXTURE_BUFFER, mountain_elevation)
//!     .write_into(dir.path(), "dem.tif");
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Resolve a test file with [`find_test_file`], or return from the calling
/// test with a skip notice when it is absent.
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "skipping: {} not found (set {} to a directory containing it)",
                    $name,
                    $crate::TEST_DATA_ENV
                );
                return;
            }
        }
    }};
}

/// Assert two numbers differ by at most `epsilon`, compared as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        assert!(
            (left - right).abs() <= epsilon,
            "{} and {} differ by more than {}",
            left,
            right,
            epsilon
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_eq_tolerance() {
        assert_approx_eq!(1.0004_f32, 1.0_f64, 0.001);
    }

    #[test]
    #[should_panic(expected = "differ by more than")]
    fn test_approx_eq_rejects() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_fixture_around_tile_aligns_with_tile() {
        let fixture = DemFixture::around_tile(FIXTURE_TILE, 16, 2, position_elevation);
        let bounds = FIXTURE_TILE.mercator_bounds();
        assert_eq!(fixture.width, 20);
        assert_eq!(fixture.values[2 * 20 + 3], position_elevation(3, 2));
        assert_approx_eq!(fixture.origin_x + 2.0 * fixture.pixel_size_x, bounds.min_x, 1e-6);
        assert_approx_eq!(fixture.origin_y - 2.0 * fixture.pixel_size_y, bounds.max_y, 1e-6);
    }

    #[test]
    fn test_fixture_writes_tiff() {
        let dir = temp_test_dir();
        let fixture = DemFixture::around_tile(FIXTURE_TILE, 8, 1, mountain_elevation);
        let path = fixture.write_into(dir.path(), "dem.tif");
        let bytes = std::fs::read(path).unwrap();
        assert!(&bytes[0..2] == b"II" || &bytes[0..2] == b"MM");
    }

    #[test]
    fn test_png_fixtures() {
        let png = solid_png_tile(4, [1, 2, 3]);
        assert_eq!(&png[1..4], b"PNG");
        let jpeg = solid_jpeg_tile(4, [1, 2, 3]);
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }
}
