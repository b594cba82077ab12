//! Block-tier accounting under real memory: every returned block is a
//! writable, non-overlapping byte range, and spans flow back to the page
//! tier on release.

#![cfg(unix)]

use spantier_core::{
    DEFAULT_SPAN_PAGES, FreeListAllocator, GenericFreeListAllocator, MAX_BLOCK_SIZE, SIZE_TABLE,
    SpanAllocator,
};

fn fill(addr: usize, len: usize, byte: u8) {
    unsafe {
        std::ptr::write_bytes(addr as *mut u8, byte, len);
    }
}

fn check(addr: usize, len: usize, byte: u8) -> bool {
    let slice = unsafe { std::slice::from_raw_parts(addr as *const u8, len) };
    slice.iter().all(|&b| b == byte)
}

#[test]
fn every_block_of_a_span_is_writable_and_non_overlapping() {
    let mut pages = SpanAllocator::create(64).expect("create");
    let mut blocks = FreeListAllocator::new(64);

    let per_span = blocks.blocks_per_span();
    assert_eq!(per_span, (4096 / 64) * DEFAULT_SPAN_PAGES);

    let held: Vec<usize> = (0..per_span)
        .map(|i| {
            let addr = blocks.alloc(&mut pages).unwrap_or_else(|| panic!("block {i}"));
            fill(addr, 64, (i % 251) as u8 ^ 0x5A);
            addr
        })
        .collect();
    assert_eq!(blocks.span_count(), 1, "one span must cover the whole run");

    // Overlapping blocks would have clobbered an earlier pattern.
    for (i, &addr) in held.iter().enumerate() {
        assert!(
            check(addr, 64, (i % 251) as u8 ^ 0x5A),
            "block {i} at {addr:#x} lost its pattern"
        );
    }

    for &addr in &held {
        blocks.free(addr);
    }
    blocks.release_spans(&mut pages);
    assert_eq!(pages.used_pages(), 0);
}

#[test]
fn alloc_free_cycles_recycle_blocks_in_both_directions() {
    let mut pages = SpanAllocator::create(64).expect("create");
    let mut blocks = FreeListAllocator::new(32);

    let per_span = blocks.blocks_per_span();
    let first: Vec<usize> = (0..per_span)
        .map(|_| blocks.alloc(&mut pages).expect("block"))
        .collect();

    // Free forward, then reallocate: the same address set comes back.
    for &addr in &first {
        blocks.free(addr);
    }
    let mut again: Vec<usize> = (0..per_span)
        .map(|_| blocks.alloc(&mut pages).expect("recycled block"))
        .collect();
    assert_eq!(blocks.span_count(), 1, "no second span drawn");
    again.sort_unstable();
    let mut expected = first.clone();
    expected.sort_unstable();
    assert_eq!(again, expected);

    // Free backward and drain once more.
    for &addr in first.iter().rev() {
        blocks.free(addr);
    }
    for _ in 0..per_span {
        let addr = blocks.alloc(&mut pages).expect("block");
        fill(addr, 32, 0xC3);
    }
    assert_eq!(blocks.span_count(), 1);
    assert_eq!(blocks.free_block_count(), 0);
}

#[test]
fn router_serves_every_size_class_with_disjoint_writable_blocks() {
    let mut alloc = GenericFreeListAllocator::new(SpanAllocator::create(256).expect("create"));

    let mut held: Vec<(usize, usize, u8)> = Vec::new();
    for (class, &size) in SIZE_TABLE.iter().enumerate() {
        for i in 0..16 {
            let addr = alloc.alloc(size).expect("block");
            let byte = (class * 16 + i) as u8;
            fill(addr, size, byte);
            held.push((addr, size, byte));
        }
    }
    assert_eq!(alloc.created_classes(), SIZE_TABLE.len());

    for &(addr, size, byte) in &held {
        assert!(check(addr, size, byte), "{size}-byte block at {addr:#x}");
    }
    for (addr, size, _) in held {
        alloc.free(addr, size);
    }
}

#[test]
fn router_rejects_out_of_range_sizes_without_touching_classes() {
    let mut alloc = GenericFreeListAllocator::new(SpanAllocator::create(16).expect("create"));
    assert_eq!(alloc.alloc(0), None);
    assert_eq!(alloc.alloc(MAX_BLOCK_SIZE + 1), None);
    assert_eq!(alloc.alloc(usize::MAX), None);
    assert_eq!(alloc.created_classes(), 0);
    assert_eq!(alloc.span_allocator().used_pages(), 0);
}

#[test]
fn intermediate_sizes_share_the_covering_class() {
    let mut alloc = GenericFreeListAllocator::new(SpanAllocator::create(16).expect("create"));

    // 17..=32 all land in the 32-byte class.
    let a = alloc.alloc(17).expect("block");
    let b = alloc.alloc(32).expect("block");
    assert_eq!(alloc.created_classes(), 1);
    alloc.free(a, 17);
    // The freed 17-byte block is the next 32-byte allocation.
    assert_eq!(alloc.alloc(25), Some(a));
    alloc.free(a, 25);
    alloc.free(b, 32);
}

#[test]
fn page_budget_bounds_total_blocks_across_classes() {
    let mut alloc = GenericFreeListAllocator::new(SpanAllocator::create(16).expect("create"));

    // 15 allocable pages admit three 4-page spans in total, however they
    // are distributed across classes.
    for size in [8usize, 64, 128] {
        assert!(alloc.alloc(size).is_some(), "{size}-byte class span");
    }
    assert_eq!(alloc.span_allocator().used_pages(), 3 * DEFAULT_SPAN_PAGES);
    assert_eq!(alloc.span_allocator().free_pages(), 3);

    // A fourth class cannot draw its span; classes with a span left keep
    // serving from it.
    assert!(alloc.alloc(32).is_none(), "no fourth span exists");
    assert!(alloc.alloc(8).is_some());
    assert!(alloc.alloc(128).is_some());
}
