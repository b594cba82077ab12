//! Page-span tier.
//!
//! Buddy allocation of power-of-two page runs over one reservation:
//! - per-order free lists with side-table links
//! - the buddy engine (split on alloc, coalesce on free)
//! - the owning front end over a virtual-memory reservation

pub mod allocator;
pub mod control;
pub mod free_list;

pub use allocator::SpanAllocator;
pub use control::{MIN_RESERVED_PAGES, SpanControlBlock};
pub use free_list::{SlotRef, SpanFreeList, SpanLinks};
