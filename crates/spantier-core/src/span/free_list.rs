//! Per-order free-span lists.
//!
//! A free span is identified by its base page index; at most one free span
//! can be based at any page, so the `next` links for every list live in one
//! shared side table ([`SpanLinks`]) indexed by page. The lists themselves
//! hold only a head and a length. This keeps push/pop O(1) without storing
//! pointers inside the managed memory itself.

/// Shared side table of `next` links, one slot per page of the reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanLinks {
    next: Vec<Option<usize>>,
}

impl SpanLinks {
    /// Creates an empty link table covering `n_pages` pages.
    #[must_use]
    pub fn new(n_pages: usize) -> Self {
        Self {
            next: vec![None; n_pages],
        }
    }

    fn get(&self, page: usize) -> Option<usize> {
        self.next[page]
    }

    fn set(&mut self, page: usize, link: Option<usize>) {
        self.next[page] = link;
    }
}

/// A position inside a [`SpanFreeList`]: the slot referencing a span.
///
/// `Head` is the list's head slot; `NextOf(p)` is the link slot of the free
/// span based at page `p`. Holding a position makes unlinking O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    Head,
    NextOf(usize),
}

/// Singly-linked list of same-order free spans, identified by base page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanFreeList {
    head: Option<usize>,
    len: usize,
}

impl SpanFreeList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Returns true when the list holds no spans.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of spans in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Pushes the span based at `page` onto the head. O(1).
    pub fn insert(&mut self, links: &mut SpanLinks, page: usize) {
        debug_assert!(
            links.get(page).is_none() && self.head != Some(page),
            "span {page} inserted twice"
        );
        links.set(page, self.head);
        self.head = Some(page);
        self.len += 1;
    }

    /// Removes and returns the head span. O(1).
    ///
    /// # Panics
    ///
    /// Panics if the list is empty; popping an empty list is a caller bug,
    /// not a runtime condition.
    pub fn pop(&mut self, links: &mut SpanLinks) -> usize {
        let page = self.head.expect("pop from an empty span free list");
        self.head = links.get(page);
        links.set(page, None);
        self.len -= 1;
        page
    }

    /// Read-only forward iteration over base pages, head first.
    pub fn iter<'a>(&self, links: &'a SpanLinks) -> Iter<'a> {
        Iter {
            links,
            cur: self.head,
        }
    }

    /// Scans for the span based at `page`, returning the slot referencing
    /// it. O(n).
    #[must_use]
    pub fn find_pos(&self, links: &SpanLinks, page: usize) -> Option<SlotRef> {
        if self.head == Some(page) {
            return Some(SlotRef::Head);
        }
        let mut cur = self.head;
        while let Some(node) = cur {
            if links.get(node) == Some(page) {
                return Some(SlotRef::NextOf(node));
            }
            cur = links.get(node);
        }
        None
    }

    /// Returns the position preceding `pos`, rescanning from the head.
    ///
    /// The list stores no parent links by design, trading an O(n) rescan
    /// for zero extra per-span storage.
    #[must_use]
    pub fn find_pos_before(&self, links: &SpanLinks, pos: SlotRef) -> Option<SlotRef> {
        match pos {
            SlotRef::Head => None,
            SlotRef::NextOf(page) => self.find_pos(links, page),
        }
    }

    /// Unlinks and returns the span referenced by `pos`. O(1).
    ///
    /// # Panics
    ///
    /// Panics if the slot references nothing (a stale position).
    pub fn remove(&mut self, links: &mut SpanLinks, pos: SlotRef) -> usize {
        let page = match pos {
            SlotRef::Head => {
                let page = self.head.expect("remove through an empty head slot");
                self.head = links.get(page);
                page
            }
            SlotRef::NextOf(prev) => {
                let page = links.get(prev).expect("remove through a stale position");
                links.set(prev, links.get(page));
                page
            }
        };
        links.set(page, None);
        self.len -= 1;
        page
    }
}

/// Forward iterator over a list's base pages.
pub struct Iter<'a> {
    links: &'a SpanLinks,
    cur: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let page = self.cur?;
        self.cur = self.links.get(page);
        Some(page)
    }
}
