//! Process-wide upstream tile size.

use std::sync::atomic::{AtomicU32, Ordering};

/// Upstream tile size in pixels, learned from the first decoded base tile.
///
/// Shared by every request without a lock. Zero means unset. The first
/// successful [`establish`](Self::establish) wins; later calls see the stored
/// value, which equals theirs whenever the upstream serves equally sized tiles.
#[derive(Debug, Default)]
pub struct TileSizeState {
    size: AtomicU32,
}

impl TileSizeState {
    /// An unset state.
    pub fn new() -> Self {
        Self::default()
    }

    /// A state with a known tile size. Zero leaves it unset.
    pub fn seeded(size: u32) -> Self {
        Self {
            size: AtomicU32::new(size),
        }
    }

    pub fn get(&self) -> Option<u32> {
        match self.size.load(Ordering::Acquire) {
            0 => None,
            size => Some(size),
        }
    }

    /// Record `size` unless a size is already stored, returning the stored size.
    pub fn establish(&self, size: u32) -> u32 {
        if size == 0 {
            return self.size.load(Ordering::Acquire);
        }

        match self
            .size
            .compare_exchange(0, size, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                tracing::info!(tile_size = size, "Established upstream tile size");
                size
            }
            Err(existing) => {
                if existing != size {
                    tracing::warn!(
                        stored = existing,
                        observed = size,
                        "Upstream tile size differs from the established size"
                    );
                }
                existing
            }
        }
    }
}
