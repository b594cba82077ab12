//! Fixed-block tier.
//!
//! Sub-page allocation: size classes, the per-class fixed-block allocator,
//! and the router that picks a class per request.

pub mod free_list;
pub mod generic;
pub mod size_class;

pub use free_list::{DEFAULT_SPAN_PAGES, FreeListAllocator};
pub use generic::GenericFreeListAllocator;
pub use size_class::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, NUM_SIZE_CLASSES, SIZE_TABLE};
