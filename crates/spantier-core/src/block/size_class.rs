//! Fixed block size classes for the sub-page tier.
//!
//! Five doubling classes from one pointer width up to 128 bytes. The class
//! index is computed by rounding the requested size up to the nearest
//! class boundary; larger requests belong to the span tier.

use crate::vm::PAGE_SIZE;

/// Smallest supported block size: a free block must be addressable, so a
/// class can never be narrower than one pointer.
pub const MIN_BLOCK_SIZE: usize = size_of::<usize>();

/// Largest block size served by the block tier.
pub const MAX_BLOCK_SIZE: usize = 128;

/// Number of size classes.
pub const NUM_SIZE_CLASSES: usize = 5;

/// Size class table: doubling steps from 8 to 128 bytes.
pub const SIZE_TABLE: [usize; NUM_SIZE_CLASSES] = [8, 16, 32, 64, 128];

/// Computes the class index for a requested byte size.
///
/// Returns `None` for zero and for sizes above [`MAX_BLOCK_SIZE`].
#[must_use]
pub fn class_index(size: usize) -> Option<usize> {
    if size == 0 || size > MAX_BLOCK_SIZE {
        return None;
    }
    SIZE_TABLE.iter().position(|&class| size <= class)
}

/// Returns the block size for a class index, or 0 when out of range.
#[must_use]
pub fn class_size(index: usize) -> usize {
    if index < NUM_SIZE_CLASSES {
        SIZE_TABLE[index]
    } else {
        0
    }
}

/// Blocks of `block_size` bytes that fit in one page.
#[must_use]
pub const fn max_blocks_per_page(block_size: usize) -> usize {
    PAGE_SIZE / block_size
}
