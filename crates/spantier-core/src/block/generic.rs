//! Size-class router over per-class block allocators.
//!
//! Owns the backing [`SpanAllocator`] (injected at construction — there is
//! no process-wide default instance) and creates one [`FreeListAllocator`]
//! per size class the first time that class is requested.

use crate::block::free_list::FreeListAllocator;
use crate::block::size_class::{self, MAX_BLOCK_SIZE, NUM_SIZE_CLASSES};
use crate::events::{EventLog, TierLogLevel};
use crate::span::SpanAllocator;

/// Router from requested byte sizes to fixed-block allocators.
pub struct GenericFreeListAllocator {
    classes: [Option<FreeListAllocator>; NUM_SIZE_CLASSES],
    pages: SpanAllocator,
    log: EventLog,
}

impl GenericFreeListAllocator {
    /// Wraps a span allocator as the backing store for all size classes.
    #[must_use]
    pub fn new(pages: SpanAllocator) -> Self {
        Self {
            classes: [const { None }; NUM_SIZE_CLASSES],
            pages,
            log: EventLog::new("tier"),
        }
    }

    /// Allocates `size` bytes from the matching size class.
    ///
    /// Returns `None` for zero, for sizes above [`MAX_BLOCK_SIZE`], and on
    /// exhaustion of the backing span allocator.
    pub fn alloc(&mut self, size: usize) -> Option<usize> {
        let Some(index) = size_class::class_index(size) else {
            self.log.record(
                TierLogLevel::Warn,
                "alloc",
                None,
                Some(size),
                None,
                "rejected",
                format!("size outside classes (max {MAX_BLOCK_SIZE})"),
                self.pages.free_pages(),
                self.pages.used_pages(),
            );
            return None;
        };

        let Self {
            classes,
            pages,
            log,
        } = self;

        let class = classes[index].get_or_insert_with(|| {
            let block_size = size_class::class_size(index);
            log.record(
                TierLogLevel::Debug,
                "class_created",
                None,
                Some(block_size),
                None,
                "created",
                format!("class={index}"),
                pages.free_pages(),
                pages.used_pages(),
            );
            FreeListAllocator::new(block_size)
        });

        match class.alloc(pages) {
            Some(addr) => {
                log.record(
                    TierLogLevel::Trace,
                    "alloc",
                    Some(addr),
                    Some(size),
                    None,
                    "success",
                    format!("class={index}"),
                    pages.free_pages(),
                    pages.used_pages(),
                );
                Some(addr)
            }
            None => {
                log.record(
                    TierLogLevel::Warn,
                    "alloc",
                    None,
                    Some(size),
                    None,
                    "exhausted",
                    format!("class={index} backing_span_alloc_failed"),
                    pages.free_pages(),
                    pages.used_pages(),
                );
                None
            }
        }
    }

    /// Frees a block allocated with the same `size`.
    ///
    /// No class metadata is recorded per block, so `size` must equal the
    /// size originally passed to [`alloc`] — a documented caller contract.
    ///
    /// # Panics
    ///
    /// Panics when `size` maps to no class or to a class that has never
    /// allocated.
    ///
    /// [`alloc`]: Self::alloc
    pub fn free(&mut self, addr: usize, size: usize) {
        let index = size_class::class_index(size)
            .unwrap_or_else(|| panic!("free of {size} bytes: size outside supported classes"));
        let class = self.classes[index]
            .as_mut()
            .expect("free routed to a size class that never allocated");
        class.free(addr);
        self.log.record(
            TierLogLevel::Trace,
            "free",
            Some(addr),
            Some(size),
            None,
            "success",
            format!("class={index}"),
            self.pages.free_pages(),
            self.pages.used_pages(),
        );
    }

    /// The backing span allocator.
    #[must_use]
    pub fn span_allocator(&self) -> &SpanAllocator {
        &self.pages
    }

    /// Number of size classes created so far.
    #[must_use]
    pub fn created_classes(&self) -> usize {
        self.classes.iter().flatten().count()
    }

    /// Returns a view of the router's lifecycle log records.
    #[must_use]
    pub fn lifecycle_logs(&self) -> &[crate::events::TierLogRecord] {
        self.log.records()
    }

    /// Drains the router's lifecycle log records.
    pub fn drain_lifecycle_logs(&mut self) -> Vec<crate::events::TierLogRecord> {
        self.log.drain()
    }
}

impl Drop for GenericFreeListAllocator {
    /// Returns every class's spans before the reservation itself goes.
    fn drop(&mut self) {
        let Self {
            classes, pages, ..
        } = self;
        for class in classes.iter_mut().flatten() {
            class.release_spans(pages);
        }
    }
}
