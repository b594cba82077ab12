//! Fixed-block allocator over whole spans.
//!
//! One `FreeListAllocator` serves a single block size. It draws whole
//! spans from a backing [`SpanAllocator`], slices each into uniform
//! blocks, and recycles them through an explicit stack of free addresses.
//! While a block is allocated every one of its bytes belongs to the
//! caller; the allocator keeps no per-block metadata.

use crate::block::size_class::{MIN_BLOCK_SIZE, max_blocks_per_page};
use crate::span::SpanAllocator;
use crate::vm::PAGE_SIZE;

/// Pages drawn from the span tier per refill.
pub const DEFAULT_SPAN_PAGES: usize = 4;

/// Fixed block-size allocator.
pub struct FreeListAllocator {
    block_size: usize,
    span_pages: usize,
    /// Stack of free block addresses.
    free_blocks: Vec<usize>,
    /// Base addresses of every span drawn from the backing allocator.
    spans: Vec<usize>,
}

impl FreeListAllocator {
    /// Creates an allocator for `block_size`-byte blocks backed by
    /// [`DEFAULT_SPAN_PAGES`]-page spans.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is smaller than a pointer or larger than a
    /// page.
    #[must_use]
    pub fn new(block_size: usize) -> Self {
        Self::with_span_pages(block_size, DEFAULT_SPAN_PAGES)
    }

    /// Creates an allocator with an explicit backing span size.
    ///
    /// # Panics
    ///
    /// Panics on an unusable block size or a non-power-of-two span size.
    #[must_use]
    pub fn with_span_pages(block_size: usize, span_pages: usize) -> Self {
        assert!(
            (MIN_BLOCK_SIZE..=PAGE_SIZE).contains(&block_size),
            "block size {block_size} outside [{MIN_BLOCK_SIZE}, {PAGE_SIZE}]"
        );
        assert!(
            span_pages > 0 && span_pages.is_power_of_two(),
            "span size {span_pages} is not a power-of-two page count"
        );
        Self {
            block_size,
            span_pages,
            free_blocks: Vec::new(),
            spans: Vec::new(),
        }
    }

    /// Allocates one block, drawing a fresh span on demand.
    ///
    /// Returns `None` when the free list is empty and the backing
    /// allocator is exhausted — ordinary OOM, propagated unchanged.
    pub fn alloc(&mut self, pages: &mut SpanAllocator) -> Option<usize> {
        if let Some(block) = self.free_blocks.pop() {
            return Some(block);
        }

        let span = pages.alloc(self.span_pages)?;
        self.spans.push(span);

        // Slice page by page, pushing high addresses first so blocks pop
        // in ascending address order.
        let per_page = max_blocks_per_page(self.block_size);
        for page in (0..self.span_pages).rev() {
            let page_base = span + page * PAGE_SIZE;
            for i in (0..per_page).rev() {
                self.free_blocks.push(page_base + i * self.block_size);
            }
        }
        self.free_blocks.pop()
    }

    /// Returns `block` to the free list. O(1).
    ///
    /// `block` must be a live allocation from this allocator; a double
    /// free or foreign address is not detected and corrupts the free list.
    pub fn free(&mut self, block: usize) {
        self.free_blocks.push(block);
    }

    /// Returns every span ever acquired to the backing allocator.
    ///
    /// All outstanding blocks become dangling; this is the destruction
    /// path and must be driven before the backing allocator goes away.
    pub fn release_spans(&mut self, pages: &mut SpanAllocator) {
        for span in self.spans.drain(..) {
            pages.free(span, self.span_pages);
        }
        self.free_blocks.clear();
    }

    /// The fixed block size in bytes.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Pages per backing span.
    #[must_use]
    pub fn span_pages(&self) -> usize {
        self.span_pages
    }

    /// Blocks produced by slicing one span.
    #[must_use]
    pub fn blocks_per_span(&self) -> usize {
        max_blocks_per_page(self.block_size) * self.span_pages
    }

    /// Currently free (sliced but unallocated) blocks.
    #[must_use]
    pub fn free_block_count(&self) -> usize {
        self.free_blocks.len()
    }

    /// Spans currently held from the backing allocator.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }
}
