//! Deterministic invariant pressure for the span tier: coalescing
//! closure, disjointness, round trips, and the fully worked 16-page
//! alloc/free sequence.

#![cfg(unix)]

use spantier_core::{PAGE_SIZE, SpanAllocator};

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u64() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

#[test]
fn construction_seeds_one_span_per_set_bit() {
    let pages = SpanAllocator::create(16).expect("create");
    assert_eq!(pages.total_pages(), 16);
    assert_eq!(pages.control_pages(), 1);
    assert_eq!(pages.allocable_pages(), 15);
    assert_eq!(
        pages.snapshot(),
        vec![vec![14], vec![12], vec![8], vec![0], vec![]]
    );

    let lens: Vec<usize> = pages.lists().map(|(_, list)| list.len()).collect();
    assert_eq!(lens, vec![1, 1, 1, 1, 0]);
}

#[test]
fn sixteen_page_alloc_order_and_ascending_free_convergence() {
    let mut pages = SpanAllocator::create(16).expect("create");
    let base = pages.base_addr();

    let got: Vec<usize> = (0..15)
        .map(|_| (pages.alloc(1).expect("page") - base) / PAGE_SIZE)
        .collect();
    assert_eq!(got, vec![14, 12, 13, 8, 9, 10, 11, 0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(pages.free_pages(), 0);
    assert_eq!(pages.used_pages(), 15);

    // Freeing in ascending page order walks through mechanically
    // derivable intermediate shapes and converges to the seed shape.
    let expected_shapes: [Vec<Vec<usize>>; 15] = [
        vec![vec![0], vec![], vec![], vec![], vec![]],
        vec![vec![], vec![0], vec![], vec![], vec![]],
        vec![vec![2], vec![0], vec![], vec![], vec![]],
        vec![vec![], vec![], vec![0], vec![], vec![]],
        vec![vec![4], vec![], vec![0], vec![], vec![]],
        vec![vec![], vec![4], vec![0], vec![], vec![]],
        vec![vec![6], vec![4], vec![0], vec![], vec![]],
        vec![vec![], vec![], vec![], vec![0], vec![]],
        vec![vec![8], vec![], vec![], vec![0], vec![]],
        vec![vec![], vec![8], vec![], vec![0], vec![]],
        vec![vec![10], vec![8], vec![], vec![0], vec![]],
        vec![vec![], vec![], vec![8], vec![0], vec![]],
        vec![vec![12], vec![], vec![8], vec![0], vec![]],
        vec![vec![], vec![12], vec![8], vec![0], vec![]],
        vec![vec![14], vec![12], vec![8], vec![0], vec![]],
    ];
    for (page, expected) in expected_shapes.iter().enumerate() {
        pages.free(base + page * PAGE_SIZE, 1);
        assert_eq!(&pages.snapshot(), expected, "after freeing page {page}");
    }
    assert_eq!(pages.free_pages(), 15);
}

#[test]
fn coalescing_closure_holds_for_any_free_permutation() {
    const SEEDS: [u64; 6] = [1, 2, 3, 5, 8, 13];

    for n_pages in [16usize, 64] {
        for seed in SEEDS {
            let mut pages = SpanAllocator::create(n_pages).expect("create");
            let initial = pages.snapshot();
            let allocable = pages.allocable_pages();

            let mut held: Vec<usize> = (0..allocable)
                .map(|_| pages.alloc(1).expect("order-0 span"))
                .collect();
            assert_eq!(pages.free_pages(), 0, "n={n_pages} seed={seed}");

            XorShift64::new(seed).shuffle(&mut held);
            for addr in held {
                pages.free(addr, 1);
            }
            assert_eq!(
                pages.snapshot(),
                initial,
                "n={n_pages} seed={seed}: free permutation must coalesce back"
            );
        }
    }
}

#[test]
fn outstanding_allocations_are_pairwise_disjoint() {
    const SEEDS: [u64; 4] = [11, 22, 33, 44];

    for seed in SEEDS {
        let mut pages = SpanAllocator::create(64).expect("create");
        let mut rng = XorShift64::new(seed);
        let mut ranges: Vec<(usize, usize)> = Vec::new();

        loop {
            let want = 1 + (rng.next_u64() as usize) % 8;
            let Some(addr) = pages.alloc(want) else {
                break;
            };
            let rounded = want.next_power_of_two();
            ranges.push((addr, addr + rounded * PAGE_SIZE));
        }
        assert!(!ranges.is_empty());

        for (i, &(a_start, a_end)) in ranges.iter().enumerate() {
            assert!(a_start >= pages.base_addr());
            assert!(a_end <= pages.base_addr() + pages.allocable_pages() * PAGE_SIZE);
            for &(b_start, b_end) in &ranges[i + 1..] {
                assert!(
                    a_end <= b_start || b_end <= a_start,
                    "seed={seed}: ranges {a_start:#x}..{a_end:#x} and \
                     {b_start:#x}..{b_end:#x} overlap"
                );
            }
        }
    }
}

#[test]
fn alloc_free_round_trip_restores_shape_at_every_order() {
    let mut pages = SpanAllocator::create(64).expect("create");
    for n in [1usize, 2, 3, 4, 7, 8, 16, 32] {
        let before = pages.snapshot();
        let addr = pages.alloc(n).expect("span");
        pages.free(addr, n);
        assert_eq!(pages.snapshot(), before, "round trip of {n} pages");
    }
}

#[test]
fn exhaustion_is_deterministic_per_order() {
    // Order 3: exactly one 8-page span exists.
    let mut pages = SpanAllocator::create(16).expect("create");
    let addr = pages.alloc(8).expect("single order-3 span");
    assert_eq!(pages.alloc(8), None);
    assert_eq!(pages.alloc(8), None);
    pages.free(addr, 8);
    assert!(pages.alloc(8).is_some());

    // Order 4 can never be satisfied: control pages keep any single free
    // span below the full reservation.
    let mut pages = SpanAllocator::create(16).expect("create");
    assert_eq!(pages.alloc(16), None);

    // Lower orders: floor(15 / 2^k) successes, then failure.
    for (n, expected) in [(4usize, 3usize), (2, 7), (1, 15)] {
        let mut pages = SpanAllocator::create(16).expect("create");
        let mut count = 0;
        while pages.alloc(n).is_some() {
            count += 1;
        }
        assert_eq!(count, expected, "order of {n} pages");
    }
}

#[test]
fn sequenced_alloc_free_churn_preserves_page_accounting() {
    const STEPS: usize = 4_000;

    for seed in [7u64, 9, 21] {
        let mut pages = SpanAllocator::create(64).expect("create");
        let mut rng = XorShift64::new(seed);
        let mut live: Vec<(usize, usize)> = Vec::new();

        for step in 0..STEPS {
            let roll = rng.next_u64() % 100;
            if roll < 55 {
                let want = 1 + (rng.next_u64() as usize) % 8;
                if let Some(addr) = pages.alloc(want) {
                    live.push((addr, want));
                }
            } else if !live.is_empty() {
                let idx = (rng.next_u64() as usize) % live.len();
                let (addr, want) = live.swap_remove(idx);
                pages.free(addr, want);
            }

            let held: usize = live
                .iter()
                .map(|&(_, want)| want.next_power_of_two())
                .sum();
            assert_eq!(
                pages.used_pages(),
                held,
                "seed={seed} step={step}: used pages must match live spans"
            );
            assert_eq!(pages.free_pages() + held, pages.allocable_pages());
        }

        for (addr, want) in live {
            pages.free(addr, want);
        }
        assert_eq!(pages.used_pages(), 0);
    }
}

#[test]
fn embedded_allocator_over_caller_supplied_memory() {
    // Borrow pages from an owning allocator to stand in for any
    // caller-provided page-aligned range.
    let mut outer = SpanAllocator::create(64).expect("outer");
    let region = outer.alloc(32).expect("32-page region");

    {
        let mut inner = SpanAllocator::from_raw(region, 32).expect("embed");
        assert_eq!(inner.total_pages(), 32);
        assert_eq!(inner.control_pages(), 1);
        assert_eq!(inner.allocable_pages(), 31);

        let initial = inner.snapshot();
        let a = inner.alloc(4).expect("inner span");
        assert!(a >= region && a < region + 32 * PAGE_SIZE);
        inner.free(a, 4);
        assert_eq!(inner.snapshot(), initial);
        // Dropping an embedded allocator releases nothing to the OS.
    }

    outer.free(region, 32);
    assert_eq!(outer.used_pages(), 0);
}
