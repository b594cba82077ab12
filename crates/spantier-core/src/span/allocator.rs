//! Page-granularity allocator front end.
//!
//! A `SpanAllocator` uniquely owns one reservation: either a fresh mapping
//! drawn from an injected [`VirtualMemory`] source, or a caller-supplied
//! page-aligned range when embedding. The handle is move-only; dropping it
//! releases an owned reservation exactly once.

use crate::error::{SpanCreateError, VmError};
use crate::events::{EventLog, TierLogLevel};
use crate::span::control::{MIN_RESERVED_PAGES, SpanControlBlock};
use crate::span::free_list::SpanFreeList;
use crate::vm::{PAGE_SIZE, VirtualMemory};

/// RAII guard over one owned OS reservation. Releases on drop.
struct Reservation {
    base: usize,
    n_pages: usize,
    vm: Box<dyn VirtualMemory>,
}

impl core::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reservation")
            .field("base", &self.base)
            .field("n_pages", &self.n_pages)
            .finish_non_exhaustive()
    }
}

impl Reservation {
    fn map(mut vm: Box<dyn VirtualMemory>, n_pages: usize) -> Result<Self, VmError> {
        let base = vm.reserve(n_pages)?;
        if let Err(err) = vm.commit(base, n_pages) {
            let _ = vm.release(base, n_pages);
            return Err(err);
        }
        Ok(Self { base, n_pages, vm })
    }

    fn decommit(&mut self, base: usize, n_pages: usize) -> Result<(), VmError> {
        self.vm.decommit(base, n_pages)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // Release failure in drop has nowhere to propagate; the range is
        // abandoned either way.
        let _ = self.vm.release(self.base, self.n_pages);
    }
}

/// Uniquely-owning page allocator over one reservation.
#[derive(Debug)]
pub struct SpanAllocator {
    base: usize,
    ctl: SpanControlBlock,
    reservation: Option<Reservation>,
    log: EventLog,
}

impl SpanAllocator {
    /// Creates an allocator over a fresh reservation from the system
    /// virtual-memory source.
    ///
    /// `n_pages` must be a power of two, at least 16.
    #[cfg(unix)]
    pub fn create(n_pages: usize) -> Result<Self, SpanCreateError> {
        Self::create_with(crate::vm::SystemVm, n_pages)
    }

    /// Creates an allocator over a fresh reservation from `vm`.
    pub fn create_with<V: VirtualMemory + 'static>(
        vm: V,
        n_pages: usize,
    ) -> Result<Self, SpanCreateError> {
        Self::validate_page_count(n_pages)?;
        let reservation = Reservation::map(Box::new(vm), n_pages)?;
        let base = reservation.base;
        Ok(Self::assemble(base, n_pages, Some(reservation)))
    }

    /// Creates an allocator over caller-supplied memory.
    ///
    /// `base` must be page aligned and the range must stay valid, unaliased
    /// read/write memory for the allocator's lifetime; nothing is reserved
    /// from or released to the OS. Supports embedding the span layer inside
    /// memory another component owns.
    pub fn from_raw(base: usize, n_pages: usize) -> Result<Self, SpanCreateError> {
        Self::validate_page_count(n_pages)?;
        if base % PAGE_SIZE != 0 {
            return Err(SpanCreateError::UnalignedBase(base));
        }
        Ok(Self::assemble(base, n_pages, None))
    }

    fn validate_page_count(n_pages: usize) -> Result<(), SpanCreateError> {
        if !n_pages.is_power_of_two() {
            return Err(SpanCreateError::NotPowerOfTwo(n_pages));
        }
        if n_pages < MIN_RESERVED_PAGES {
            return Err(SpanCreateError::TooFewPages {
                requested: n_pages,
                min: MIN_RESERVED_PAGES,
            });
        }
        Ok(())
    }

    fn assemble(base: usize, n_pages: usize, reservation: Option<Reservation>) -> Self {
        let ctl = SpanControlBlock::new(n_pages);
        let mut log = EventLog::new("span");
        log.record(
            TierLogLevel::Debug,
            "create",
            Some(base),
            Some(n_pages),
            Some(ctl.max_order()),
            "success",
            if reservation.is_some() {
                "backing=owned_reservation"
            } else {
                "backing=caller_supplied"
            },
            ctl.free_pages(),
            ctl.used_pages(),
        );
        Self {
            base,
            ctl,
            reservation,
            log,
        }
    }

    fn order_for(n_pages: usize) -> usize {
        n_pages.next_power_of_two().trailing_zeros() as usize
    }

    /// Allocates `n_pages` pages, rounded up to the next power of two.
    ///
    /// Returns the base address of the span, or `None` when no
    /// sufficiently large span is free or the rounded order exceeds the
    /// reservation's maximum.
    ///
    /// # Panics
    ///
    /// Panics if `n_pages` is zero.
    pub fn alloc(&mut self, n_pages: usize) -> Option<usize> {
        assert!(n_pages > 0, "alloc of zero pages");
        let order = Self::order_for(n_pages);
        if order > self.ctl.max_order() {
            self.log.record(
                TierLogLevel::Warn,
                "alloc",
                None,
                Some(n_pages),
                Some(order),
                "exhausted",
                "order_exceeds_reservation",
                self.ctl.free_pages(),
                self.ctl.used_pages(),
            );
            return None;
        }

        match self.ctl.alloc(order) {
            Some(page) => {
                let addr = self.base + page * PAGE_SIZE;
                self.log.record(
                    TierLogLevel::Trace,
                    "alloc",
                    Some(addr),
                    Some(n_pages),
                    Some(order),
                    "success",
                    format!("page={page}"),
                    self.ctl.free_pages(),
                    self.ctl.used_pages(),
                );
                Some(addr)
            }
            None => {
                self.log.record(
                    TierLogLevel::Warn,
                    "alloc",
                    None,
                    Some(n_pages),
                    Some(order),
                    "exhausted",
                    "no_free_span_at_or_above_order",
                    self.ctl.free_pages(),
                    self.ctl.used_pages(),
                );
                None
            }
        }
    }

    /// Frees the span at `addr` spanning `n_pages` pages.
    ///
    /// `addr`/`n_pages` must exactly match a prior successful [`alloc`]
    /// that has not been freed since; beyond the cheap alignment and range
    /// asserts below, a mismatch (including double free) is undefined.
    ///
    /// Owned reservations drop the span's physical backing on free; the
    /// range stays reserved and reusable.
    ///
    /// [`alloc`]: Self::alloc
    pub fn free(&mut self, addr: usize, n_pages: usize) {
        assert!(n_pages > 0, "free of zero pages");
        assert!(
            addr >= self.base && (addr - self.base) % PAGE_SIZE == 0,
            "freed address {addr:#x} is not a page of this reservation"
        );
        let page = (addr - self.base) / PAGE_SIZE;
        let order = Self::order_for(n_pages);
        assert!(
            self.ctl.owns(page) && page + (1 << order) <= self.ctl.allocable_pages(),
            "freed span {addr:#x}+{n_pages}p is outside the allocable range"
        );

        self.ctl.free(page, order);

        if let Some(reservation) = self.reservation.as_mut() {
            if let Err(err) = reservation.decommit(addr, 1 << order) {
                self.log.record(
                    TierLogLevel::Warn,
                    "decommit",
                    Some(addr),
                    Some(1 << order),
                    Some(order),
                    "vm_error",
                    err.to_string(),
                    self.ctl.free_pages(),
                    self.ctl.used_pages(),
                );
            }
        }

        self.log.record(
            TierLogLevel::Trace,
            "free",
            Some(addr),
            Some(n_pages),
            Some(order),
            "success",
            format!("page={page}"),
            self.ctl.free_pages(),
            self.ctl.used_pages(),
        );
    }

    /// Base address of the reservation.
    #[must_use]
    pub fn base_addr(&self) -> usize {
        self.base
    }

    /// One past the last address of the reservation.
    #[must_use]
    pub fn end_addr(&self) -> usize {
        self.base + self.ctl.total_pages() * PAGE_SIZE
    }

    /// True when `addr` lies inside the allocable part of the reservation.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.base + self.ctl.allocable_pages() * PAGE_SIZE
    }

    /// Total pages in the reservation.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.ctl.total_pages()
    }

    /// Pages reserved for bookkeeping.
    #[must_use]
    pub fn control_pages(&self) -> usize {
        self.ctl.control_pages()
    }

    /// Pages available to `alloc` over the reservation's lifetime.
    #[must_use]
    pub fn allocable_pages(&self) -> usize {
        self.ctl.allocable_pages()
    }

    /// Currently free pages.
    #[must_use]
    pub fn free_pages(&self) -> usize {
        self.ctl.free_pages()
    }

    /// Currently allocated pages.
    #[must_use]
    pub fn used_pages(&self) -> usize {
        self.ctl.used_pages()
    }

    /// Largest order a request may round to.
    #[must_use]
    pub fn max_order(&self) -> usize {
        self.ctl.max_order()
    }

    /// Ascending iteration over the per-order free lists.
    pub fn lists(&self) -> impl Iterator<Item = (usize, &SpanFreeList)> {
        self.ctl.lists()
    }

    /// Base pages of every free span of `order`, head first.
    #[must_use]
    pub fn order_spans(&self, order: usize) -> Vec<usize> {
        self.ctl.order_spans(order)
    }

    /// Free-list shape of the underlying control block.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vec<usize>> {
        self.ctl.snapshot()
    }

    /// Returns a view of the lifecycle log records.
    #[must_use]
    pub fn lifecycle_logs(&self) -> &[crate::events::TierLogRecord] {
        self.log.records()
    }

    /// Drains the lifecycle log records.
    pub fn drain_lifecycle_logs(&mut self) -> Vec<crate::events::TierLogRecord> {
        self.log.drain()
    }
}
