//! Masked compositing of an overlay tile onto a base tile.

use tile_common::{PixelTile, RGB_BANDS};

/// Merge `overlay` onto `base`.
///
/// Each output sample is the overlay's where the overlay pixel is valid and the
/// base's otherwise. The result is always fully valid.
///
/// # Panics
/// Panics if the tiles are not compatible. A mismatch means the base tile and
/// the overlay read disagree on tile size, which is a bookkeeping bug rather
/// than a recoverable condition.
pub fn merge(base: &PixelTile, overlay: &PixelTile) -> PixelTile {
    assert!(
        base.is_compatible(overlay),
        "base tile {:?} and overlay tile {:?} have different shapes",
        base.shape(),
        overlay.shape()
    );

    let plane = base.width() * base.height();
    let mut data = base.data().to_vec();
    let overlay_data = overlay.data();

    for (i, &masked) in overlay.mask().iter().enumerate() {
        if !masked {
            for band in 0..RGB_BANDS {
                let idx = band * plane + i;
                data[idx] = overlay_data[idx];
            }
        }
    }

    PixelTile::opaque(base.width(), base.height(), data)
        .unwrap_or_else(|| unreachable!("merged buffer has the base tile's shape"))
}
