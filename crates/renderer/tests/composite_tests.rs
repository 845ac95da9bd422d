//! Tests for masked tile compositing.

use renderer::merge;
use tile_common::PixelTile;

fn solid(width: usize, height: usize, rgb: [u8; 3], mask: Vec<bool>) -> PixelTile {
    let plane = width * height;
    let mut data = Vec::with_capacity(plane * 3);
    for value in rgb {
        data.extend(std::iter::repeat(value).take(plane));
    }
    PixelTile::new(width, height, data, mask).unwrap()
}

#[test]
fn test_partial_overlap_every_pixel_and_band() {
    let (w, h) = (16, 16);
    let base = solid(w, h, [10, 20, 30], vec![false; w * h]);
    // Left half valid overlay, right half masked.
    let mask: Vec<bool> = (0..w * h).map(|i| i % w >= w / 2).collect();
    let overlay = solid(w, h, [200, 210, 220], mask.clone());

    let merged = merge(&base, &overlay);
    assert!(merged.is_fully_valid());
    assert_eq!(merged.masked_count(), 0);

    for row in 0..h {
        for col in 0..w {
            let expected = if mask[row * w + col] {
                base.pixel(row, col)
            } else {
                overlay.pixel(row, col)
            };
            assert_eq!(merged.pixel(row, col), expected, "pixel ({}, {})", row, col);
        }
    }
}

#[test]
fn test_fully_masked_overlay_yields_base() {
    let base = solid(8, 8, [1, 2, 3], vec![false; 64]);
    let overlay = solid(8, 8, [9, 9, 9], vec![true; 64]);
    assert_eq!(merge(&base, &overlay).data(), base.data());
}

#[test]
fn test_fully_valid_overlay_yields_overlay() {
    let base = solid(8, 8, [1, 2, 3], vec![false; 64]);
    let overlay = solid(8, 8, [9, 8, 7], vec![false; 64]);
    assert_eq!(merge(&base, &overlay).data(), overlay.data());
}

#[test]
fn test_inputs_are_not_mutated() {
    let base = solid(4, 4, [1, 2, 3], vec![false; 16]);
    let overlay = solid(4, 4, [9, 8, 7], (0..16).map(|i| i < 8).collect());
    let (base_before, overlay_before) = (base.clone(), overlay.clone());
    let _ = merge(&base, &overlay);
    assert_eq!(base, base_before);
    assert_eq!(overlay, overlay_before);
}
