//! Elevation generators for synthetic DEM fixtures.
//!
//! Values are deterministic so tests can recompute the expected elevation of
//! any pixel.

/// A mountainous surface between 850 m and 2200 m.
///
/// Suitable as the `elevation` closure of `DemFixture::around_tile`.
///
/// # Example
///
/// ```
/// use test_utils::mountain_elevation;
///
/// let v = mountain_elevation(10, 20);
/// assert!(v > 0.0 && v < 2500.0);
/// ```
pub fn mountain_elevation(col: usize, row: usize) -> f32 {
    let ridge = ((col as f32) * 0.02).sin() * 400.0;
    let valley = ((row as f32) * 0.015).cos() * 250.0;
    let slope = (col + row) as f32 * 0.3;
    1500.0 + ridge + valley + slope.min(50.0)
}

/// Elevation that encodes its own pixel position: `col + row * 0.5`.
///
/// # Example
///
/// ```
/// use test_utils::position_elevation;
///
/// assert_eq!(position_elevation(4, 2), 5.0);
/// ```
pub fn position_elevation(col: usize, row: usize) -> f32 {
    col as f32 + row as f32 * 0.5
}

/// A row-major grid filled by `f(col, row)`.
pub fn elevation_grid<F>(width: usize, height: usize, f: F) -> Vec<f32>
where
    F: Fn(usize, usize) -> f32,
{
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(f(col, row));
        }
    }
    data
}
