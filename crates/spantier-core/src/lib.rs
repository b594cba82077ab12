//! # spantier-core
//!
//! Two-tier, host-memory-backed allocator:
//!
//! - a page-granularity buddy allocator ([`SpanAllocator`]) managing a
//!   reserved virtual address range in power-of-two page runs, and
//! - a fixed-block tier ([`FreeListAllocator`], routed by
//!   [`GenericFreeListAllocator`]) that slices whole spans into
//!   uniform-size blocks.
//!
//! Single-threaded contract: no internal synchronization anywhere. Wrap an
//! instance in a lock or keep one per thread. All bookkeeping is ordinary
//! owned state referencing the managed range by page index; `unsafe` is
//! confined to the OS virtual-memory module.

#![deny(unsafe_code)]

pub mod block;
pub mod error;
pub mod events;
pub mod span;
#[allow(unsafe_code)]
pub mod vm;

pub use block::{
    DEFAULT_SPAN_PAGES, FreeListAllocator, GenericFreeListAllocator, MAX_BLOCK_SIZE,
    MIN_BLOCK_SIZE, NUM_SIZE_CLASSES, SIZE_TABLE,
};
pub use error::{SpanCreateError, VmError};
pub use events::{EventLog, TierLogLevel, TierLogRecord};
pub use span::{SpanAllocator, SpanControlBlock, SpanFreeList};
pub use vm::{PAGE_SIZE, VirtualMemory};
#[cfg(unix)]
pub use vm::SystemVm;
