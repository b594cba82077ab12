//! Buddy engine over one reservation.
//!
//! Works entirely in page indices relative to the reservation base; the
//! bookkeeping is ordinary owned state referencing the managed range, never
//! living inside it. The buddy of an order-k span is found by flipping bit
//! k of its base page index.

use super::free_list::{SpanFreeList, SpanLinks};

/// Smallest reservation the control block accepts, in pages.
pub const MIN_RESERVED_PAGES: usize = 16;

/// Bytes of bookkeeping charged against the reservation: one list head per
/// order plus the page counters. Deterministic in the order alone, so two
/// equal-size reservations always charge the same control tail.
const COUNTER_BYTES: usize = 4 * size_of::<usize>();

/// Buddy allocator state for a single reservation of `n_pages` pages.
#[derive(Debug)]
pub struct SpanControlBlock {
    n_pages: usize,
    control_pages: usize,
    max_order: usize,
    lists: Vec<SpanFreeList>,
    links: SpanLinks,
}

impl SpanControlBlock {
    /// Builds the control block and seeds the free lists.
    ///
    /// `n_pages` must be a power of two and at least [`MIN_RESERVED_PAGES`];
    /// the front end validates before calling.
    ///
    /// The control pages form a deterministic tail of the reservation. The
    /// remaining pages decompose into one aligned power-of-two span per set
    /// bit, placed low addresses first: 16 pages seed {8@0, 4@8, 2@12,
    /// 1@14} with page 15 reserved for bookkeeping.
    #[must_use]
    pub fn new(n_pages: usize) -> Self {
        debug_assert!(n_pages.is_power_of_two());
        debug_assert!(n_pages >= MIN_RESERVED_PAGES);

        let max_order = n_pages.trailing_zeros() as usize;
        let control_pages = Self::control_pages_for(max_order);
        let mut lists = vec![SpanFreeList::new(); max_order + 1];
        let mut links = SpanLinks::new(n_pages);

        let allocable = n_pages - control_pages;
        let mut offset = 0;
        for order in (0..=max_order).rev() {
            if allocable & (1 << order) != 0 {
                lists[order].insert(&mut links, offset);
                offset += 1 << order;
            }
        }

        Self {
            n_pages,
            control_pages,
            max_order,
            lists,
            links,
        }
    }

    fn control_pages_for(max_order: usize) -> usize {
        let bytes = (max_order + 1) * size_of::<usize>() + COUNTER_BYTES;
        bytes.div_ceil(crate::vm::PAGE_SIZE).max(1)
    }

    /// Allocates an order-`order` span, splitting a larger span on demand.
    ///
    /// Returns the base page index, or `None` when no span of this order or
    /// above is free (ordinary exhaustion, recoverable).
    pub fn alloc(&mut self, order: usize) -> Option<usize> {
        if order > self.max_order {
            return None;
        }
        if !self.lists[order].is_empty() {
            return Some(self.lists[order].pop(&mut self.links));
        }

        let from = ((order + 1)..=self.max_order).find(|&o| !self.lists[o].is_empty())?;
        let page = self.lists[from].pop(&mut self.links);

        // Halve down to the requested order, parking each unused upper
        // half one order below the span being split.
        let mut cur = from;
        while cur > order {
            cur -= 1;
            self.lists[cur].insert(&mut self.links, page + (1 << cur));
        }
        Some(page)
    }

    /// Frees the order-`order` span based at `page`, coalescing with its
    /// buddy recursively while the buddy is itself free.
    pub fn free(&mut self, page: usize, order: usize) {
        debug_assert!(order <= self.max_order);
        debug_assert_eq!(page % (1 << order), 0, "span base not order aligned");
        debug_assert!(page + (1 << order) <= self.allocable_pages());

        let mut page = page;
        let mut order = order;
        while order < self.max_order {
            let buddy = page ^ (1 << order);
            let Some(pos) = self.lists[order].find_pos(&self.links, buddy) else {
                break;
            };
            self.lists[order].remove(&mut self.links, pos);
            page = page.min(buddy);
            order += 1;
        }
        self.lists[order].insert(&mut self.links, page);
    }

    /// Total pages in the reservation.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.n_pages
    }

    /// Pages consumed by bookkeeping, never handed out.
    #[must_use]
    pub fn control_pages(&self) -> usize {
        self.control_pages
    }

    /// Pages available to `alloc` over the reservation's lifetime.
    #[must_use]
    pub fn allocable_pages(&self) -> usize {
        self.n_pages - self.control_pages
    }

    /// Currently free pages, summed as count × 2^order over all lists.
    #[must_use]
    pub fn free_pages(&self) -> usize {
        self.lists
            .iter()
            .enumerate()
            .map(|(order, list)| list.len() << order)
            .sum()
    }

    /// Currently allocated pages.
    #[must_use]
    pub fn used_pages(&self) -> usize {
        self.allocable_pages() - self.free_pages()
    }

    /// Largest order a request may round to.
    #[must_use]
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// True when `page` lies inside the allocable range.
    #[must_use]
    pub fn owns(&self, page: usize) -> bool {
        page < self.allocable_pages()
    }

    /// Ascending iteration over the free lists, for diagnostics.
    pub fn lists(&self) -> impl Iterator<Item = (usize, &SpanFreeList)> {
        self.lists.iter().enumerate()
    }

    /// Base pages of every free span of `order`, head first.
    #[must_use]
    pub fn order_spans(&self, order: usize) -> Vec<usize> {
        self.lists[order].iter(&self.links).collect()
    }

    /// Free-list shape: per-order base pages, ascending order. Two control
    /// blocks with equal snapshots are in identical states.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vec<usize>> {
        (0..=self.max_order).map(|o| self.order_spans(o)).collect()
    }
}
