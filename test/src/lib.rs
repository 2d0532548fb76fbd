//! Tests for `lea_alloc`.
//!
//! The centrepiece is a quickcheck model: random traces of malloc, free,
//! and realloc run against a fresh allocator, with every payload filled
//! with a per-allocation byte pattern so that any overlap between live
//! allocations is caught at free time. The `extra_assertions` feature is
//! enabled here, so every public call also re-validates the whole heap.

use lea_alloc::{LeaAlloc, ALIGNMENT, ALLOC_UNIT};
use quickcheck::{quickcheck, Arbitrary, Gen};

#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Allocate this many bytes.
    Malloc(usize),

    /// Free the n^th allocation we've made, or no-op if it has already
    /// been freed.
    Free(usize),

    /// Resize the n^th allocation, or no-op if it has already been freed.
    Realloc(usize, usize),
}

pub use Operation::*;

impl Operation {
    #[inline]
    fn arbitrary_malloc(g: &mut Gen, active_allocs: &mut Vec<usize>, num_allocs: &mut usize) -> Self {
        active_allocs.push(*num_allocs);
        *num_allocs += 1;

        // Zero sized allocation 1/1000 times; it must yield null.
        if usize::arbitrary(g) % 1000 == 0 {
            return Malloc(0);
        }

        // Large allocation with P = 1/20.
        if usize::arbitrary(g) % 20 == 0 {
            return Malloc(usize::arbitrary(g) % (64 * 1024) + 1);
        }

        // Small allocation: either a skinny odd size or a round number of
        // allocation units.
        if bool::arbitrary(g) {
            Malloc(usize::arbitrary(g) % 5 + 12)
        } else {
            Malloc(ALLOC_UNIT * (usize::arbitrary(g) % 16 + 1))
        }
    }

    #[inline]
    fn arbitrary_free(g: &mut Gen, active_allocs: &mut Vec<usize>) -> Self {
        assert!(!active_allocs.is_empty());
        let i = usize::arbitrary(g) % active_allocs.len();
        Free(active_allocs.swap_remove(i))
    }

    #[inline]
    fn arbitrary_realloc(g: &mut Gen, active_allocs: &[usize]) -> Self {
        assert!(!active_allocs.is_empty());
        let idx = active_allocs[usize::arbitrary(g) % active_allocs.len()];
        Realloc(idx, usize::arbitrary(g) % (8 * 1024) + 1)
    }
}

#[derive(Debug, Clone)]
pub struct Operations(pub Vec<Operation>);

// Every public call re-walks the whole heap under `extra_assertions`, so
// keep traces short enough that a run stays in the seconds.
const NUM_OPERATIONS: usize = 2_000;

impl Arbitrary for Operations {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut num_allocs = 0;
        let mut active_allocs = vec![];
        let mut operations = Vec::with_capacity(NUM_OPERATIONS);

        for _ in 0..NUM_OPERATIONS {
            // Free with P = 1/4 and realloc with P ~ 3/16 so the trace
            // keeps a healthy population of live allocations while still
            // exercising the merge and move paths.
            if !active_allocs.is_empty() && usize::arbitrary(g) % 4 == 0 {
                operations.push(Operation::arbitrary_free(g, &mut active_allocs));
            } else if !active_allocs.is_empty() && usize::arbitrary(g) % 4 == 0 {
                operations.push(Operation::arbitrary_realloc(g, &active_allocs));
            } else {
                operations.push(Operation::arbitrary_malloc(
                    g,
                    &mut active_allocs,
                    &mut num_allocs,
                ));
            }
        }

        operations.reserve_exact(active_allocs.len());
        while !active_allocs.is_empty() {
            operations.push(Operation::arbitrary_free(g, &mut active_allocs));
        }

        Operations(operations)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let ops = self.0.clone();
        let prefixes =
            (0..self.0.len()).map(move |i| Operations(ops.iter().cloned().take(i).collect()));

        let free_indices: Vec<_> = self
            .0
            .iter()
            .enumerate()
            .filter_map(|(i, op)| if let Free(_) = *op { Some(i) } else { None })
            .collect();

        let ops = self.0.clone();
        let without_frees = free_indices.into_iter().map(move |i| {
            Operations(
                ops.iter()
                    .enumerate()
                    .filter_map(|(j, op)| if i == j { None } else { Some(*op) })
                    .collect(),
            )
        });

        let malloc_indices: Vec<_> = self
            .0
            .iter()
            .enumerate()
            .filter_map(|(i, op)| if let Malloc(_) = *op { Some(i) } else { None })
            .collect();

        let ops = self.0.clone();
        let smaller_allocs = malloc_indices.into_iter().map(move |i| {
            Operations(
                ops.iter()
                    .enumerate()
                    .map(|(j, op)| {
                        if i == j {
                            if let Malloc(size) = *op {
                                Malloc(size / 2)
                            } else {
                                *op
                            }
                        } else {
                            *op
                        }
                    })
                    .collect(),
            )
        });

        Box::new(prefixes.chain(without_frees).chain(smaller_allocs))
    }
}

fn pattern_for(op_index: usize) -> u8 {
    (op_index as u8).wrapping_mul(31).wrapping_add(7)
}

fn verify_pattern(ptr: *mut u8, len: usize, pattern: u8) {
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
    assert!(
        bytes.iter().all(|byte| *byte == pattern),
        "allocation at {:p} was scribbled over (expected {:#x})",
        ptr,
        pattern
    );
}

impl Operations {
    /// Run the trace against a fresh allocator, checking alignment on every
    /// pointer handed out and payload integrity on every free and realloc,
    /// then free everything and insist the heap collapses back into a
    /// single free region.
    pub fn run(&self) {
        let heap = LeaAlloc::INIT;
        let mut allocs: Vec<Option<(*mut u8, usize, u8)>> = Vec::new();

        for (op_index, op) in self.0.iter().cloned().enumerate() {
            match op {
                Malloc(size) => {
                    let ptr = heap.malloc(size);
                    if size == 0 {
                        assert!(ptr.is_null(), "zero sized allocations must yield null");
                        allocs.push(None);
                        continue;
                    }
                    assert!(!ptr.is_null(), "allocation of {} bytes failed", size);
                    assert_eq!(ptr as usize % ALIGNMENT, 0, "{:p} is misaligned", ptr);
                    let pattern = pattern_for(op_index);
                    unsafe { ptr.write_bytes(pattern, size) };
                    allocs.push(Some((ptr, size, pattern)));
                }
                Free(idx) => {
                    if let Some(entry) = allocs.get_mut(idx) {
                        if let Some((ptr, size, pattern)) = entry.take() {
                            verify_pattern(ptr, size, pattern);
                            unsafe { heap.free(ptr) };
                        }
                    }
                }
                Realloc(idx, new_size) => {
                    if let Some(entry) = allocs.get_mut(idx) {
                        if let Some((ptr, old_size, pattern)) = entry.take() {
                            let new_ptr = unsafe { heap.realloc(ptr, new_size) };
                            assert!(!new_ptr.is_null(), "realloc to {} bytes failed", new_size);
                            assert_eq!(new_ptr as usize % ALIGNMENT, 0);
                            verify_pattern(new_ptr, old_size.min(new_size), pattern);
                            let pattern = pattern_for(op_index);
                            unsafe { new_ptr.write_bytes(pattern, new_size) };
                            *entry = Some((new_ptr, new_size, pattern));
                        }
                    }
                }
            }
        }

        for entry in allocs.iter_mut() {
            if let Some((ptr, size, pattern)) = entry.take() {
                verify_pattern(ptr, size, pattern);
                unsafe { heap.free(ptr) };
            }
        }

        let info = heap.mallinfo();
        if info.arena > 0 {
            assert_eq!(info.ordblks, 1, "a drained heap is one big free region");
            assert_eq!(info.uordblks, 0);
            assert_eq!(info.fordblks + ALIGNMENT, info.arena);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

macro_rules! run_quickchecks {
    ($name:ident) => {
        #[test]
        fn $name() {
            fn random_trace(ops: Operations) {
                ops.run();
            }

            quickcheck::QuickCheck::new()
                .tests(1)
                .quickcheck(random_trace as fn(Operations));
        }
    };
}

// Let the test harness run each of our quickchecks concurrently with each
// other; every run gets its own allocator.
run_quickchecks!(quickchecks_0);
run_quickchecks!(quickchecks_1);
run_quickchecks!(quickchecks_2);
run_quickchecks!(quickchecks_3);

quickcheck! {
    fn memalign_payloads_land_on_the_boundary(align_pow: u8, size: usize) -> bool {
        let align = 1usize << (align_pow % 13);
        let size = size % 65536 + 1;

        let heap = LeaAlloc::INIT;
        let ptr = heap.memalign(align, size);
        if ptr.is_null() {
            return false;
        }
        let aligned = ptr as usize % align == 0 && ptr as usize % ALIGNMENT == 0;
        unsafe { heap.free(ptr) };

        let info = heap.mallinfo();
        aligned && info.ordblks == 1 && info.fordblks + ALIGNMENT == info.arena
    }
}

////////////////////////////////////////////////////////////////////////////////

fn align_up(size: usize) -> usize {
    (size + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

#[test]
fn smoke() {
    let heap = LeaAlloc::INIT;
    unsafe {
        let ptr = heap.malloc(1);
        assert!(!ptr.is_null());
        *ptr = 9;
        assert_eq!(*ptr, 9);
        heap.free(ptr);

        let ptr = heap.malloc(1);
        assert!(!ptr.is_null());
        *ptr = 10;
        assert_eq!(*ptr, 10);
        heap.free(ptr);
    }
}

#[test]
fn freed_region_is_reused_for_the_same_size() {
    let heap = LeaAlloc::INIT;
    let first = heap.malloc(100);
    assert!(!first.is_null());
    unsafe { heap.free(first) };
    let second = heap.malloc(100);
    assert_eq!(second, first);
    unsafe { heap.free(second) };
}

#[test]
fn near_fit_is_recovered_from_the_class_below() {
    // 150 rounds up to a capacity whose class floor is under 150, so a
    // second request of 150 is only satisfied by the bounded lookback into
    // the class below the guaranteed one.
    let heap = LeaAlloc::INIT;
    let first = heap.malloc(150);
    assert!(!first.is_null());
    unsafe { heap.free(first) };
    let second = heap.malloc(150);
    assert_eq!(second, first);
    unsafe { heap.free(second) };
}

#[test]
fn fresh_allocations_pack_tightly() {
    let heap = LeaAlloc::INIT;
    let first = heap.malloc(100);
    let second = heap.malloc(10);
    let third = heap.malloc(10);
    assert!(!first.is_null() && !second.is_null() && !third.is_null());

    // Each new region lands one header past the previous payload.
    assert_eq!(second as usize - first as usize, align_up(100) + ALIGNMENT);
    assert_eq!(third as usize - second as usize, align_up(10) + ALIGNMENT);

    let info = heap.mallinfo();
    assert_eq!(info.arena, 3 * ALIGNMENT + align_up(100) + 2 * align_up(10));
    assert_eq!(info.ordblks, 0);
    assert_eq!(info.uordblks + info.fordblks + 3 * ALIGNMENT, info.arena);

    // The middle and top allocations coalesce into one free region, header
    // of the absorbed region included.
    unsafe {
        heap.free(second);
        heap.free(third);
    }
    let info = heap.mallinfo();
    assert_eq!(info.ordblks, 1);
    assert_eq!(info.fordblks, 2 * align_up(10) + ALIGNMENT);

    // Freeing the bottom one collapses the whole heap.
    unsafe { heap.free(first) };
    let info = heap.mallinfo();
    assert_eq!(info.ordblks, 1);
    assert_eq!(info.fordblks + ALIGNMENT, info.arena);
}

#[test]
fn all_sizes_reuse_the_heap_base_when_nothing_else_is_live() {
    let heap = LeaAlloc::INIT;
    let base = heap.malloc(100);
    assert!(!base.is_null());
    unsafe { heap.free(base) };

    // Whether the lone free region is recycled, split, or extended, the
    // payload always comes back at the heap base.
    for size in 1..300 {
        let ptr = heap.malloc(size);
        assert_eq!(ptr, base, "allocation of {} bytes moved off the base", size);
        unsafe { heap.free(ptr) };
    }
}

#[test]
fn realloc_round_trips_in_place() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.malloc(64);
    assert!(!ptr.is_null());
    unsafe { ptr.write_bytes(0xAB, 64) };

    let same = unsafe { heap.realloc(ptr, 64) };
    assert_eq!(same, ptr);
    verify_pattern(same, 64, 0xAB);

    let shrunk = unsafe { heap.realloc(ptr, 16) };
    assert_eq!(shrunk, ptr);
    verify_pattern(shrunk, 16, 0xAB);

    unsafe { heap.free(shrunk) };
}

#[test]
fn realloc_extends_the_last_region_in_place() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.malloc(100);
    assert!(!ptr.is_null());
    unsafe { ptr.write_bytes(0x5A, 100) };

    // The region sits at the top of the heap, so growth is a break bump.
    let grown = unsafe { heap.realloc(ptr, 1000) };
    assert_eq!(grown, ptr);
    verify_pattern(grown, 100, 0x5A);

    unsafe { heap.free(grown) };
}

#[test]
fn realloc_absorbs_a_free_neighbor() {
    let heap = LeaAlloc::INIT;
    let bottom = heap.malloc(4 * ALLOC_UNIT);
    let middle = heap.malloc(4 * ALLOC_UNIT);
    let top = heap.malloc(4 * ALLOC_UNIT);
    assert!(!bottom.is_null() && !middle.is_null() && !top.is_null());

    unsafe { bottom.write_bytes(0xC3, 4 * ALLOC_UNIT) };
    unsafe { heap.free(middle) };

    // `top` boxes the region in from above, so the only way to grow in
    // place is to swallow the freed middle region.
    let grown = unsafe { heap.realloc(bottom, 5 * ALLOC_UNIT) };
    assert_eq!(grown, bottom);
    verify_pattern(grown, 4 * ALLOC_UNIT, 0xC3);

    unsafe {
        heap.free(grown);
        heap.free(top);
    }
}

#[test]
fn realloc_moves_when_boxed_in() {
    let heap = LeaAlloc::INIT;
    let bottom = heap.malloc(64);
    let top = heap.malloc(64);
    assert!(!bottom.is_null() && !top.is_null());

    unsafe { bottom.write_bytes(0x77, 64) };
    unsafe { top.write_bytes(0x88, 64) };

    let moved = unsafe { heap.realloc(bottom, 64 * 1024) };
    assert!(!moved.is_null());
    assert_ne!(moved, bottom);
    verify_pattern(moved, 64, 0x77);
    verify_pattern(top, 64, 0x88);

    unsafe {
        heap.free(moved);
        heap.free(top);
    }
    let info = heap.mallinfo();
    assert_eq!(info.ordblks, 1);
    assert_eq!(info.fordblks + ALIGNMENT, info.arena);
}

#[test]
fn realloc_grows_small_to_large() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.malloc(16);
    assert!(!ptr.is_null());
    unsafe { ptr.write_bytes(0x3C, 16) };

    let grown = unsafe { heap.realloc(ptr, 1024) };
    assert!(!grown.is_null());
    verify_pattern(grown, 16, 0x3C);
    unsafe { grown.write_bytes(0x3D, 1024) };

    unsafe { heap.free(grown) };
}

#[test]
fn calloc_zeroes_recycled_regions() {
    let heap = LeaAlloc::INIT;
    let first = heap.calloc(10, 10);
    assert!(!first.is_null());
    verify_pattern(first, 100, 0);
    unsafe { first.write_bytes(0xAA, 100) };
    unsafe { heap.free(first) };

    // Same capacity, so the dirty region is recycled; it must come back
    // zeroed all the same.
    let second = heap.calloc(25, 4);
    assert_eq!(second, first);
    verify_pattern(second, 100, 0);
    unsafe { heap.free(second) };
}

#[test]
fn zero_sized_and_null_operations_are_inert() {
    let heap = LeaAlloc::INIT;
    assert!(heap.malloc(0).is_null());
    unsafe { heap.free(std::ptr::null_mut()) };
    assert!(unsafe { heap.realloc(std::ptr::null_mut(), 0) }.is_null());

    // realloc of null is just malloc.
    let ptr = unsafe { heap.realloc(std::ptr::null_mut(), 100) };
    assert!(!ptr.is_null());

    // realloc to zero is just free.
    assert!(unsafe { heap.realloc(ptr, 0) }.is_null());
    let info = heap.mallinfo();
    assert_eq!(info.ordblks, 1);
}

#[test]
fn allocate_size_zero() {
    use std::iter;
    Operations(
        iter::repeat(Malloc(0))
            .take(1000)
            .chain((0..1000).map(Free))
            .collect(),
    )
    .run();
}

#[test]
fn allocate_many_small() {
    use std::iter;
    Operations(
        iter::repeat(Malloc(16 * ALLOC_UNIT))
            .take(100)
            .chain((0..100).map(Free))
            .chain(iter::repeat(Malloc(3 * ALLOC_UNIT)).take(100))
            .chain((0..100).map(|i| Free(i + 100)))
            .collect(),
    )
    .run();
}

#[test]
fn allocate_many_large() {
    use std::iter;
    Operations(
        iter::repeat(Malloc(257 * ALLOC_UNIT))
            .take(100)
            .chain((0..100).map(Free))
            .chain(iter::repeat(Malloc(1024 * ALLOC_UNIT)).take(100))
            .chain((0..100).map(|i| Free(i + 100)))
            .collect(),
    )
    .run();
}

#[test]
fn regression_test_0() {
    Operations(vec![Malloc(1)]).run();
}

#[test]
fn regression_test_1() {
    Operations(vec![Malloc(1414), Free(0), Malloc(1414), Free(1)]).run();
}

#[test]
fn regression_test_2() {
    Operations(vec![Malloc(168), Free(0), Malloc(0), Malloc(168), Free(2)]).run();
}

#[test]
fn regression_test_3() {
    Operations(vec![Malloc(13672), Free(0), Malloc(1)]).run();
}

#[test]
fn regression_test_4() {
    Operations(vec![Malloc(100), Free(0), Malloc(100), Realloc(1, 300), Free(1)]).run();
}

#[test]
fn exhausted_growth_fails_cleanly() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.malloc(100);
    assert!(!ptr.is_null());

    let before = heap.mallinfo();
    assert!(heap.malloc(usize::MAX / 2).is_null());
    assert_eq!(heap.mallinfo(), before, "a failed allocation must not disturb the heap");

    // Requests that would wrap the size arithmetic fail the same way.
    assert!(heap.malloc(usize::MAX).is_null());
    assert_eq!(heap.mallinfo(), before);

    let again = heap.malloc(100);
    assert!(!again.is_null());
    unsafe {
        heap.free(ptr);
        heap.free(again);
    }
}

#[test]
fn memalign_returns_boundary_addresses_and_recycles() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.memalign(256, 100);
    assert!(!ptr.is_null());
    assert_eq!(ptr as usize % 256, 0);
    unsafe { heap.free(ptr) };

    // The aligned region went back to the pool; a plain allocation may
    // reuse any part of it.
    let reused = heap.malloc(100);
    assert!(!reused.is_null());
    unsafe { heap.free(reused) };

    let info = heap.mallinfo();
    assert_eq!(info.ordblks, 1);
    assert_eq!(info.fordblks + ALIGNMENT, info.arena);
}

#[test]
fn memalign_small_alignments_degenerate_to_malloc() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.memalign(8, 100);
    assert!(!ptr.is_null());
    assert_eq!(ptr as usize % ALIGNMENT, 0);
    unsafe { heap.free(ptr) };

    assert!(heap.memalign(48, 100).is_null(), "non-power-of-two alignment");
    assert!(heap.memalign(256, 0).is_null(), "zero size");
}

#[test]
fn posix_memalign_reports_einval_and_enomem() {
    use std::ptr;

    let heap = LeaAlloc::INIT;
    let mut out: *mut u8 = ptr::null_mut();
    unsafe {
        assert_eq!(heap.posix_memalign(&mut out, 3, 100), lea_alloc::EINVAL);
        assert_eq!(heap.posix_memalign(&mut out, 2, 100), lea_alloc::EINVAL);
        assert_eq!(heap.posix_memalign(&mut out, 0, 100), lea_alloc::EINVAL);
        assert_eq!(
            heap.posix_memalign(&mut out, 1024, usize::MAX / 2),
            lea_alloc::ENOMEM
        );

        assert_eq!(heap.posix_memalign(&mut out, 1024, 0), 0);
        assert!(out.is_null());

        assert_eq!(heap.posix_memalign(&mut out, 1024, 100), 0);
        assert!(!out.is_null());
        assert_eq!(out as usize % 1024, 0);
        heap.free(out);
    }
}

#[test]
fn blank_slate_forgets_everything() {
    let heap = LeaAlloc::INIT;
    let ptr = heap.malloc(100);
    assert!(!ptr.is_null());
    unsafe {
        heap.free(ptr);
        heap.blank_slate();
    }
    assert_eq!(heap.mallinfo(), lea_alloc::Mallinfo::default());

    // The old bytes are abandoned for good; a new allocation starts a new
    // first region further up.
    let fresh = heap.malloc(100);
    assert!(!fresh.is_null());
    assert_ne!(fresh, ptr);
    unsafe { heap.free(fresh) };
}

#[test]
fn independent_allocators_do_not_interfere() {
    let a = LeaAlloc::INIT;
    let b = LeaAlloc::INIT;

    let pa = a.malloc(100);
    let pb = b.malloc(100);
    assert!(!pa.is_null() && !pb.is_null());
    unsafe {
        pa.write_bytes(0x11, 100);
        pb.write_bytes(0x22, 100);
    }
    verify_pattern(pa, 100, 0x11);
    verify_pattern(pb, 100, 0x22);

    unsafe {
        a.free(pa);
        b.free(pb);
    }
    for heap in [&a, &b] {
        let info = heap.mallinfo();
        assert_eq!(info.ordblks, 1);
        assert_eq!(info.fordblks + ALIGNMENT, info.arena);
    }
}

// Derived from the stress test in
// https://github.com/alexcrichton/dlmalloc-rs/blob/master/tests/smoke.rs
#[test]
fn stress() {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    let heap = LeaAlloc::INIT;
    let mut rng = SmallRng::seed_from_u64(0x1ea_a110c);
    let mut live: Vec<(*mut u8, usize, u8)> = Vec::new();

    unsafe {
        for i in 0..5_000u32 {
            let free = !live.is_empty()
                && ((live.len() < 1_000 && rng.gen_bool(1.0 / 3.0)) || rng.gen());
            if free {
                let idx = rng.gen_range(0..live.len());
                let (ptr, size, pattern) = live.swap_remove(idx);
                verify_pattern(ptr, size, pattern);
                heap.free(ptr);
                continue;
            }

            if !live.is_empty() && rng.gen_bool(0.01) {
                let idx = rng.gen_range(0..live.len());
                let (ptr, old_size, pattern) = live.swap_remove(idx);
                let new_size = if rng.gen() {
                    rng.gen_range(old_size..old_size * 2 + 1)
                } else {
                    rng.gen_range(old_size / 2 + 1..old_size + 1)
                };
                let new_ptr = heap.realloc(ptr, new_size);
                assert!(!new_ptr.is_null());
                verify_pattern(new_ptr, old_size.min(new_size), pattern);
                let pattern = (i % 251) as u8;
                new_ptr.write_bytes(pattern, new_size);
                live.push((new_ptr, new_size, pattern));
                continue;
            }

            let size = if rng.gen() {
                rng.gen_range(1..128)
            } else {
                rng.gen_range(1..128 * 1024)
            };
            let zeroed = rng.gen_bool(0.05);
            let ptr = if zeroed {
                let ptr = heap.calloc(size, 1);
                assert!(!ptr.is_null());
                verify_pattern(ptr, size, 0);
                ptr
            } else {
                heap.malloc(size)
            };
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % ALIGNMENT, 0);
            let pattern = (i % 251) as u8;
            ptr.write_bytes(pattern, size);
            live.push((ptr, size, pattern));
        }

        for (ptr, size, pattern) in live.drain(..) {
            verify_pattern(ptr, size, pattern);
            heap.free(ptr);
        }
    }

    let info = heap.mallinfo();
    assert_eq!(info.ordblks, 1);
    assert_eq!(info.fordblks + ALIGNMENT, info.arena);
}
