/*!

## About

`lea_alloc`: the **L**inear, **E**lfin **A**llocator.

- **Linear:** manages a single contiguous arena that only ever grows, fed by
  an sbrk-style program break. Nothing is ever returned to the operating
  system; freed regions go on internal free lists for reuse.

- **Elfin, i.e. small:** one word-pair-sized header per allocation, a few
  hundred lines of core logic, and no dependence on the heavy panicking or
  formatting infrastructure.

`lea_alloc` targets single-threaded 32-bit environments where the only way
to obtain memory is a monotonically growing break, and where simplicity and
a small footprint matter more than allocation throughput. It provides the
classical free-store surface — [`malloc`][LeaAlloc::malloc],
[`free`][LeaAlloc::free], [`calloc`][LeaAlloc::calloc],
[`realloc`][LeaAlloc::realloc], [`memalign`][LeaAlloc::memalign],
[`posix_memalign`][LeaAlloc::posix_memalign], and
[`mallinfo`][LeaAlloc::mallinfo] — plus a stable `GlobalAlloc`
implementation so it can back a Rust program outright.

Backends exist for WebAssembly linear memory, unix (one big lazily-committed
mapping), Windows (`VirtualAlloc` reserve/commit), and an OS-independent
static array, so the allocator and code using it can be tested anywhere.

## Using `lea_alloc` as the Global Allocator

```
use lea_alloc::LeaAlloc;

// Use `lea_alloc` as the global allocator.
#[global_allocator]
static ALLOC: LeaAlloc = LeaAlloc::INIT;
# fn main() {}
```

## `cargo` Features

- **extra_assertions**: Enable various extra, expensive integrity
  assertions, including a full walk of every region and free list before and
  after each public operation. This incurs a large runtime overhead. It is
  useful when debugging heap corruption or `lea_alloc` itself.

- **static_array_backend**: Force the use of an OS-independent backing
  implementation with a global maximum size fixed at compile time. The size
  defaults to 32 MiB (33554432 bytes), and may be controlled at build time
  by supplying an optional environment variable to cargo,
  `LEA_ALLOC_STATIC_ARRAY_BACKEND_BYTES`.

## Implementation Notes and Constraints

- Every allocation costs one [`ALIGNMENT`]-sized header and every payload is
  rounded up to a multiple of [`ALLOC_UNIT`]. Payloads are always
  [`ALIGNMENT`]-aligned.

- The regions of the heap tile the arena exactly. A region knows its total
  size and the region before it; the region after it is *computed* from the
  size, so adjacency costs one stored pointer, not two.

- Free regions are kept on one of `usize::BITS` (32, on the intended
  targets) size-class free lists, indexed by the floor of the base-2 log of
  their capacity. Freeing coalesces with adjacent free regions immediately,
  so no two free regions are ever adjacent.

- Allocation is first-fit over the guaranteed-big-enough classes, preceded
  by a short bounded scan of the class below them to catch recently freed
  near-fits. Requests that miss the free lists grow the arena by only the
  shortfall whenever the highest region can be extended.

- The heap never shrinks. Freed space is reused, never released.

Here is a diagram giving an overview of the implementation:

```text
+------------------------------------------------------------------+
| Program break (sbrk-like: grows, never shrinks)                  |
+------------------------------------------------------------------+
       |
       | contiguous growth
       V
+------------------------------------------------------------------+
| Arena: regions tiling the address range, each header + payload   |
|                                                                  |
|   +--------+----------+--------+------+----------------+------+  |
|   | used   | free     | used   | used | free           | used |  |
|   +--------+----------+--------+------+----------------+------+  |
|        ^        |                           |                    |
+--------|--------|---------------------------|--------------------+
         |        |                           |
  payload|        | capacity 2^k..2^(k+1)     | capacity 2^j..2^(j+1)
  to the |        V                           V
  caller |  +-----------------------------------------------------+
         |  | Free lists, one per size class, linked through the  |
         |  | payload bytes of the free regions themselves        |
         |  +-----------------------------------------------------+
```

## License

Licensed under the [Mozilla Public License 2.0](https://www.mozilla.org/en-US/MPL/2.0/).

 */

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod extra_assert;

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "static_array_backend")] {
        mod imp_static_array;
        use imp_static_array as imp;
    } else if #[cfg(target_arch = "wasm32")] {
        mod imp_wasm32;
        use imp_wasm32 as imp;
    } else if #[cfg(unix)] {
        mod imp_unix;
        use imp_unix as imp;
    } else if #[cfg(windows)] {
        mod imp_windows;
        use imp_windows as imp;
    } else {
        compile_error! {
            "There is no `lea_alloc` program-break backend for this target; want to send a pull request? :)"
        }
    }
}

mod const_init;
mod free_lists;
mod region;

use core::alloc::{GlobalAlloc, Layout};
use core::cell::UnsafeCell;
use core::cmp;
use core::mem;
use core::ptr::{self, NonNull};

use memory_units::Bytes;

use const_init::ConstInit;
use free_lists::FreeLists;
use region::Region;

/// Every returned payload address is a multiple of this.
///
/// It is also the size of a region header: 16 bytes when pointers are 4
/// bytes wide, which is the environment this allocator models, and 32 bytes
/// on 64-bit hosts so the header still fits its slot.
pub const ALIGNMENT: usize = 4 * mem::size_of::<usize>();

/// Even a one byte request occupies this much payload; it is the floor of
/// the smallest size class.
pub const ALLOC_UNIT: usize = ALIGNMENT;

/// Status returned by [`LeaAlloc::posix_memalign`] for an unusable
/// alignment.
pub const EINVAL: i32 = 22;

/// Status returned by [`LeaAlloc::posix_memalign`] when memory is
/// exhausted.
pub const ENOMEM: i32 = 12;

/// In-band metadata size at the start of each region.
pub(crate) const HEADER_SIZE: Bytes = Bytes(ALIGNMENT);

/// The smallest region worth carving out: a header plus one allocation
/// unit.
const MIN_REGION_SIZE: Bytes = Bytes(ALIGNMENT + ALLOC_UNIT);

// Freeing a 100 byte region files it under the 64-byte class, but a later
// 100 byte request searches the 128-byte class, where membership guarantees
// a fit. The class below *may* still hold that perfectly good region, and
// if it was freed recently it sits right at the head, so a short bounded
// scan recovers it without hurting the worst case. Three tries also
// suffices to cover the topmost class, which cannot hold more than one
// member without exhausting a 32-bit address space.
const SPECULATIVE_FREE_LIST_TRIES: usize = 3;

// Sizes this close to the top of the address space would overflow the
// round-up arithmetic; they can never be satisfied anyway.
const MAX_REQUEST: usize = usize::MAX - 2 * ALIGNMENT;

pub(crate) struct AllocError;

/// Round a size up to the next multiple of [`ALIGNMENT`].
fn align_up(size: Bytes) -> Bytes {
    Bytes((size.0 + ALIGNMENT - 1) & !(ALIGNMENT - 1))
}

/// Round an in-arena address up to the next multiple of [`ALIGNMENT`].
fn align_up_addr(addr: usize) -> usize {
    (addr + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Round `addr` up to the next multiple of the power-of-two `align`, or
/// `None` if that would wrap.
fn align_up_to(addr: usize, align: usize) -> Option<usize> {
    extra_assert!(align.is_power_of_two());
    addr.checked_add(align - 1).map(|a| a & !(align - 1))
}

/// A snapshot of heap statistics, shaped like C's `struct mallinfo`.
///
/// Produced by a single walk over the region list. Fields the walk cannot
/// meaningfully fill are zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mallinfo {
    /// Bytes between the first region and the current end of the heap.
    pub arena: usize,
    /// Number of free regions.
    pub ordblks: usize,
    /// Always zero.
    pub smblks: usize,
    /// Always zero.
    pub hblks: usize,
    /// Always zero.
    pub hblkhd: usize,
    /// Always zero.
    pub usmblks: usize,
    /// Always zero.
    pub fsmblks: usize,
    /// Total payload capacity of used regions, in bytes.
    pub uordblks: usize,
    /// Total payload capacity of free regions, in bytes.
    pub fordblks: usize,
    /// Always zero.
    pub keepcost: usize,
}

struct Heap {
    arena: imp::Arena,
    first_region: *mut Region,
    last_region: *mut Region,
    free_lists: FreeLists,
}

impl ConstInit for Heap {
    const INIT: Heap = Heap {
        arena: imp::Arena::INIT,
        first_region: ptr::null_mut(),
        last_region: ptr::null_mut(),
        free_lists: FreeLists::INIT,
    };
}

impl Heap {
    /// The region after `region` in address order, or null for the last.
    unsafe fn next_region(&self, region: *mut Region) -> *mut Region {
        if region == self.last_region {
            ptr::null_mut()
        } else {
            region::end_of(region) as *mut Region
        }
    }

    /// Merge a just-freed region, not yet on any list, into an adjacent
    /// free neighbor. The survivor ends up on the right free list; returns
    /// false if both neighbors were in use.
    ///
    /// Before the call the only free-free adjacency in the heap involves
    /// `region` itself, so one pass here is enough to restore the
    /// no-adjacent-free-regions invariant.
    unsafe fn merge_into_neighbors(&mut self, region: *mut Region) -> bool {
        extra_assert!((*region).is_free());
        let prev = (*region).prev();
        let next = self.next_region(region);

        if !prev.is_null() && (*prev).is_free() {
            // Fold into the region below us. Its size class may change, so
            // it has to come off its list first.
            self.free_lists.remove(prev);
            (*prev).grow_total((*region).total_size());
            if next.is_null() {
                self.last_region = prev;
            } else {
                (*next).set_prev(prev);
                // The region above us may be free as well; keep folding.
                if (*next).is_free() {
                    self.free_lists.remove(next);
                    let after = self.next_region(next);
                    (*prev).grow_total((*next).total_size());
                    if after.is_null() {
                        self.last_region = prev;
                    } else {
                        (*after).set_prev(prev);
                    }
                }
            }
            self.free_lists.insert(prev);
            return true;
        }

        if !next.is_null() && (*next).is_free() {
            self.free_lists.remove(next);
            let after = self.next_region(next);
            (*region).grow_total((*next).total_size());
            if after.is_null() {
                self.last_region = region;
            } else {
                (*after).set_prev(region);
            }
            self.free_lists.insert(region);
            return true;
        }

        false
    }

    /// Return a region to the free pool: coalesce if possible, list it
    /// otherwise.
    unsafe fn release_region(&mut self, region: *mut Region) {
        (*region).set_free();
        if !self.merge_into_neighbors(region) {
            self.free_lists.insert(region);
        }
    }

    /// Once `size` bytes of `region`'s payload are spoken for, carve the
    /// trailing slack off into a region of its own if it is big enough to
    /// stand alone. Too-small slack stays put as internal fragmentation.
    unsafe fn split_remainder(&mut self, region: *mut Region, size: Bytes) {
        let payload_size = (*region).max_payload();
        extra_assert!(payload_size >= size);
        if payload_size.0 - size.0 < MIN_REGION_SIZE.0 {
            return;
        }

        // The next region is derived from total_size; capture it before the
        // resize below changes the derivation.
        let next = self.next_region(region);
        let end = region::end_of(region) as usize;
        let split = align_up_addr(region::payload_of(region) as usize + size.0) as *mut Region;
        let split_total = Bytes(end - split as usize);
        extra_assert!(split_total >= MIN_REGION_SIZE);

        (*region).set_total_size(Bytes(split as usize - region as usize));
        region::init(split, split_total, Bytes(0));
        (*split).set_prev(region);
        if next.is_null() {
            self.last_region = split;
        } else {
            (*next).set_prev(split);
        }

        // The slack may itself touch a free region, e.g. after a shrinking
        // realloc, so give the coalescer a chance before listing it.
        if !self.merge_into_neighbors(split) {
            self.free_lists.insert(split);
        }
    }

    /// Mark `region` as carrying `size` live payload bytes and shed any
    /// oversized remainder.
    unsafe fn use_region(&mut self, region: *mut Region, size: Bytes) {
        (*region).set_used_payload(size);
        self.split_remainder(region, size);
    }

    unsafe fn use_free_region(&mut self, region: *mut Region, size: Bytes) -> *mut Region {
        self.free_lists.remove(region);
        self.use_region(region, size);
        region
    }

    /// Look for a free region able to hold `size` payload bytes. Null on
    /// miss.
    unsafe fn try_from_free_list(&mut self, size: Bytes) -> *mut Region {
        let index = free_lists::index_big_enough(size);

        // The class below the guaranteed one may hold recently freed
        // regions that are in fact large enough; scan a few before walking
        // the guaranteed classes.
        if index > free_lists::MIN_FREE_LIST_INDEX
            && size.0 < free_lists::min_size_for_index(index)
        {
            let mut candidate = self.free_lists.head(index - 1);
            let mut tries = 0;
            while !candidate.is_null() && tries < SPECULATIVE_FREE_LIST_TRIES {
                if (*candidate).max_payload() >= size {
                    return self.use_free_region(candidate, size);
                }
                candidate = (*region::free_links(candidate)).next;
                tries += 1;
            }
        }

        for index in index..free_lists::NUM_FREE_LISTS {
            let head = self.free_lists.head(index);
            if !head.is_null() {
                return self.use_free_region(head, size);
            }
        }

        ptr::null_mut()
    }

    /// Grow the arena by just the shortfall so the last region's payload
    /// reaches `size`, and mark it used. On failure nothing has changed.
    unsafe fn extend_last_region(&mut self, size: Bytes) -> Result<(), AllocError> {
        let last = self.last_region;
        let reusable = (*last).max_payload();
        extra_assert!(reusable.0 < size.0);

        let grow = Bytes(align_up(size).0 - reusable.0);
        let old = self.arena.grow(grow)?;
        extra_assert_eq!(old.as_ptr(), region::end_of(last));

        (*last).grow_total(grow);
        (*last).set_used_payload(size);
        Ok(())
    }

    /// The free lists had nothing; obtain `size` payload bytes from the top
    /// of the heap as cheaply as possible.
    unsafe fn new_allocation(&mut self, size: Bytes) -> Result<*mut Region, AllocError> {
        extra_assert!(size.0 > 0);

        let last = self.last_region;
        if !last.is_null() && !(*last).is_free() {
            // A used last region can carry more than a unit of trailing
            // slack (a move-realloc that absorbed its neighbor and then
            // could not complete leaves it behind). Shed it like any other
            // remainder so it can serve this request.
            self.split_remainder(last, (*last).used_payload());
        }

        let last = self.last_region;
        if !last.is_null() {
            if (*last).is_free() {
                // Extending the highest region costs only the shortfall and
                // leaves no stranded free space behind.
                self.free_lists.remove(last);
                // The bounded free-list scan can overlook this region even
                // when it is already big enough; no growth needed then.
                if size <= (*last).max_payload() {
                    self.use_region(last, size);
                    return Ok(last);
                }
                match self.extend_last_region(size) {
                    Ok(()) => return Ok(last),
                    Err(e) => {
                        // Growth failed with the region already unlinked;
                        // put it back exactly as it was.
                        self.free_lists.insert(last);
                        return Err(e);
                    }
                }
            }

            // The highest region is taken, but aligned slack at its end can
            // seed the new region and save that much growth.
            let aligned_used = align_up((*last).used_payload());
            let slack = Bytes((*last).max_payload().0 - aligned_used.0);
            if slack.0 > 0 {
                extra_assert!(slack.0 >= ALLOC_UNIT);
                let grow = Bytes(HEADER_SIZE.0 + align_up(size).0 - slack.0);
                let old = self.arena.grow(grow)?;
                extra_assert_eq!(old.as_ptr(), region::end_of(last));

                let start = region::end_of(last).sub(slack.0) as *mut Region;
                (*last).shrink_total(slack);
                region::init(start, Bytes(grow.0 + slack.0), Bytes(0));
                (*start).set_prev(last);
                self.last_region = start;
                (*start).set_used_payload(size);
                return Ok(start);
            }
        }

        self.fresh_region(size, Bytes(ALIGNMENT))
    }

    /// Append a brand new region whose payload is aligned to
    /// `payload_align`, growing the heap from its current end.
    unsafe fn fresh_region(
        &mut self,
        size: Bytes,
        payload_align: Bytes,
    ) -> Result<*mut Region, AllocError> {
        extra_assert!(payload_align.0.is_power_of_two());
        extra_assert!(payload_align.0 >= ALIGNMENT);

        let brk = self.arena.grow(Bytes(0))?.as_ptr() as usize;
        let start = match brk
            .checked_add(HEADER_SIZE.0)
            .and_then(|payload| align_up_to(payload, payload_align.0))
        {
            Some(payload) => payload - HEADER_SIZE.0,
            None => return Err(AllocError),
        };

        let pad = Bytes(start - brk);
        if pad.0 > 0 {
            let old = self.arena.grow(pad)?;
            extra_assert_eq!(old.as_ptr() as usize, brk);
            let last = self.last_region;
            if last.is_null() {
                // One-time break alignment fix: the bytes below the first
                // region are never part of the heap.
            } else if (*last).is_free() {
                // Absorbing the pad can change the region's size class.
                self.free_lists.remove(last);
                (*last).grow_total(pad);
                self.free_lists.insert(last);
            } else {
                (*last).grow_total(pad);
                // A coarse alignment pad can amount to whole regions worth
                // of slack; shed it so later slack-seeded growth stays
                // within one allocation unit.
                self.split_remainder(last, (*last).used_payload());
            }
        }

        let total = Bytes(HEADER_SIZE.0 + align_up(size).0);
        let old = self.arena.grow(total)?;
        extra_assert_eq!(old.as_ptr() as usize, start);

        let start = start as *mut Region;
        region::init(start, total, Bytes(0));
        (*start).set_prev(self.last_region);
        if self.first_region.is_null() {
            self.first_region = start;
        }
        self.last_region = start;
        self.use_region(start, size);
        Ok(start)
    }

    unsafe fn malloc_impl(&mut self, size: Bytes) -> Result<NonNull<u8>, AllocError> {
        extra_assert!(size.0 > 0);
        let mut region = self.try_from_free_list(size);
        if region.is_null() {
            region = self.new_allocation(size)?;
        }
        Ok(NonNull::new_unchecked(region::payload_of(region)))
    }

    unsafe fn realloc_impl(
        &mut self,
        region: *mut Region,
        size: Bytes,
    ) -> Result<NonNull<u8>, AllocError> {
        extra_assert!(size.0 > 0);

        // Simple growth or shrink within the payload we already own.
        if size <= (*region).max_payload() {
            self.use_region(region, size);
            return Ok(NonNull::new_unchecked(region::payload_of(region)));
        }

        // Free space sitting right above us can be absorbed wholesale.
        let next = self.next_region(region);
        if !next.is_null() && (*next).is_free() {
            self.free_lists.remove(next);
            let after = self.next_region(next);
            (*region).grow_total((*next).total_size());
            if after.is_null() {
                self.last_region = region;
            } else {
                (*after).set_prev(region);
            }
            if size <= (*region).max_payload() {
                self.use_region(region, size);
                return Ok(NonNull::new_unchecked(region::payload_of(region)));
            }
        }

        // Highest region: pay for only the shortfall. When even that fails
        // the free lists below may still hold a big enough region.
        if region == self.last_region && self.extend_last_region(size).is_ok() {
            return Ok(NonNull::new_unchecked(region::payload_of(region)));
        }

        // Move: allocate, copy the live bytes, release the old region.
        let old_used = (*region).used_payload();
        let mut new_region = self.try_from_free_list(size);
        if new_region.is_null() {
            new_region = self.new_allocation(size)?;
        }
        let new_payload = region::payload_of(new_region);
        ptr::copy_nonoverlapping(region::payload_of(region), new_payload, old_used.0);
        self.release_region(region);
        Ok(NonNull::new_unchecked(new_payload))
    }

    unsafe fn memalign_impl(
        &mut self,
        align: Bytes,
        size: Bytes,
    ) -> Result<NonNull<u8>, AllocError> {
        extra_assert!(align.0.is_power_of_two());
        extra_assert!(align.0 > ALIGNMENT);
        extra_assert!(size.0 > 0);

        // A free region with `align` bytes to spare may happen to sit on
        // the boundary already; worth one cheap look before growing.
        if let Some(padded) = size.0.checked_add(align.0) {
            let region = self.try_from_free_list(Bytes(padded));
            if !region.is_null() {
                let payload = region::payload_of(region);
                if payload as usize % align.0 == 0 {
                    // Only `size` bytes are needed; re-split the surplus.
                    self.use_region(region, size);
                    return Ok(NonNull::new_unchecked(payload));
                }
                self.release_region(region);
            }
        }

        let region = self.fresh_region(size, align)?;
        Ok(NonNull::new_unchecked(region::payload_of(region)))
    }

    unsafe fn mallinfo_impl(&self) -> Mallinfo {
        let mut info = Mallinfo::default();
        if self.first_region.is_null() {
            return info;
        }
        info.arena = region::end_of(self.last_region) as usize - self.first_region as usize;
        let mut region = self.first_region;
        while !region.is_null() {
            if (*region).is_free() {
                info.ordblks += 1;
                info.fordblks += (*region).max_payload().0;
            } else {
                info.uordblks += (*region).max_payload().0;
            }
            region = self.next_region(region);
        }
        info
    }

    fn blank_slate_impl(&mut self) {
        self.free_lists.reset();
        self.first_region = ptr::null_mut();
        self.last_region = ptr::null_mut();
    }
}

cfg_if! {
    if #[cfg(feature = "extra_assertions")] {
        impl Heap {
            // Walk the whole heap and re-assert every structural invariant:
            // regions tile the arena, back links match, no two adjacent
            // regions are both free, and the free lists hold exactly the
            // free regions, each in the class its capacity dictates. This
            // is O(heap), so it only runs under `extra_assertions`.
            unsafe fn validate_all(&self) {
                let mut free_regions = 0usize;
                let mut prev: *mut Region = ptr::null_mut();
                let mut curr = self.first_region;
                while !curr.is_null() {
                    assert_eq!(curr as usize % ALIGNMENT, 0, "regions must be aligned");
                    assert_eq!((*curr).prev(), prev, "stored back link must match walk order");
                    if !prev.is_null() {
                        assert_eq!(
                            region::end_of(prev),
                            curr as *mut u8,
                            "regions must tile the arena"
                        );
                        assert!(
                            !((*prev).is_free() && (*curr).is_free()),
                            "adjacent free regions must have been merged"
                        );
                    }
                    assert_eq!(
                        (*curr).total_size().0 % ALIGNMENT,
                        0,
                        "region sizes must be multiples of the allocation unit"
                    );
                    assert!((*curr).used_payload() <= (*curr).max_payload());
                    if (*curr).is_free() {
                        free_regions += 1;
                    }
                    prev = curr;
                    curr = self.next_region(curr);
                }
                if prev.is_null() {
                    assert!(self.first_region.is_null());
                    assert!(self.last_region.is_null());
                } else {
                    assert_eq!(prev, self.last_region);
                }

                let mut listed_regions = 0usize;
                for index in 0..free_lists::NUM_FREE_LISTS {
                    let mut link_prev: *mut Region = ptr::null_mut();
                    let mut member = self.free_lists.head(index);
                    while !member.is_null() {
                        listed_regions += 1;
                        assert!(
                            (*member).is_free(),
                            "used regions must stay off the free lists"
                        );
                        assert_eq!(
                            (*region::free_links(member)).prev,
                            link_prev,
                            "free list back links must match walk order"
                        );
                        let capacity = (*member).max_payload().0;
                        assert!(free_lists::min_size_for_index(index) <= capacity);
                        assert!(capacity < free_lists::max_size_for_index(index));
                        link_prev = member;
                        member = (*region::free_links(member)).next;
                    }
                }
                assert_eq!(
                    free_regions, listed_regions,
                    "every free region is on exactly one free list"
                );
            }
        }
    } else {
        impl Heap {
            #[inline(always)]
            unsafe fn validate_all(&self) {}
        }
    }
}

/// A linear, elfin allocator.
///
/// All state lives inside the value, so independent allocators can coexist;
/// each one draws from its own arena. [`LeaAlloc::INIT`] is a `const`, which
/// is what makes the `#[global_allocator]` use possible.
///
/// # Safety
///
/// When used on unix, the value should not be moved once allocation has
/// begun (a `static` naturally never moves).
pub struct LeaAlloc {
    lock: imp::Lock,
    heap: UnsafeCell<Heap>,
}

unsafe impl Sync for LeaAlloc {}

impl ConstInit for LeaAlloc {
    const INIT: LeaAlloc = LeaAlloc {
        lock: imp::Lock::INIT,
        heap: UnsafeCell::new(Heap::INIT),
    };
}

impl LeaAlloc {
    /// An initial `const` default construction of a `LeaAlloc` allocator.
    ///
    /// This is usable for initializing `static`s that get set as the global
    /// allocator.
    pub const INIT: Self = <Self as ConstInit>::INIT;

    /// Run `f` with exclusive access to the heap state.
    ///
    /// # Safety
    ///
    /// `f` must not call back into this allocator; the lock is not
    /// re-entrant.
    unsafe fn with_heap<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Heap) -> T,
    {
        self.lock.acquire();
        let result = f(&mut *self.heap.get());
        self.lock.release();
        result
    }

    /// Allocate `size` bytes and return the payload address, aligned to
    /// [`ALIGNMENT`].
    ///
    /// Returns null when `size` is zero or when the arena cannot grow any
    /// further; in the latter case the heap is left exactly as it was.
    ///
    /// ```
    /// let heap = lea_alloc::LeaAlloc::INIT;
    ///
    /// let p = heap.malloc(100);
    /// assert!(!p.is_null());
    /// assert_eq!(p as usize % lea_alloc::ALIGNMENT, 0);
    /// unsafe { heap.free(p) };
    /// ```
    pub fn malloc(&self, size: usize) -> *mut u8 {
        if size == 0 || size > MAX_REQUEST {
            return ptr::null_mut();
        }
        let size = Bytes(size);
        unsafe {
            self.with_heap(|heap| unsafe {
                heap.validate_all();
                let result = heap.malloc_impl(size);
                heap.validate_all();
                match result {
                    Ok(payload) => payload.as_ptr(),
                    Err(AllocError) => ptr::null_mut(),
                }
            })
        }
    }

    /// Return `ptr`'s region to the heap, merging it with any free
    /// neighbor. A null `ptr` is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a payload address previously returned by this
    /// allocator and not freed since.
    pub unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let region = region::from_payload(ptr);
        self.with_heap(|heap| unsafe {
            heap.validate_all();
            heap.release_region(region);
            heap.validate_all();
        });
    }

    /// Allocate zeroed space for `nmemb` elements of `size` bytes each.
    ///
    /// The element count multiplication wraps; guarding it against overflow
    /// is the caller's concern.
    pub fn calloc(&self, nmemb: usize, size: usize) -> *mut u8 {
        let bytes = nmemb.wrapping_mul(size);
        let ptr = self.malloc(bytes);
        if !ptr.is_null() {
            // Recycled regions hold stale bytes, and growth is not
            // guaranteed to be zeroed either. Always wipe.
            unsafe { ptr::write_bytes(ptr, 0, bytes) };
        }
        ptr
    }

    /// Resize the allocation at `ptr` to `size` bytes, in place when the
    /// region can grow where it stands and by moving otherwise.
    ///
    /// A null `ptr` behaves like [`malloc`][LeaAlloc::malloc]; a zero
    /// `size` frees `ptr` and returns null. On failure null is returned and
    /// the old allocation remains valid and untouched.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a payload address previously returned by this
    /// allocator and not freed since.
    pub unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.malloc(size);
        }
        if size == 0 {
            self.free(ptr);
            return ptr::null_mut();
        }
        if size > MAX_REQUEST {
            return ptr::null_mut();
        }
        let region = region::from_payload(ptr);
        let size = Bytes(size);
        self.with_heap(|heap| unsafe {
            heap.validate_all();
            let result = heap.realloc_impl(region, size);
            heap.validate_all();
            match result {
                Ok(payload) => payload.as_ptr(),
                Err(AllocError) => ptr::null_mut(),
            }
        })
    }

    /// Allocate `size` bytes whose address is a multiple of `align`.
    ///
    /// `align` must be a power of two; alignments up to [`ALIGNMENT`] come
    /// for free and degenerate to [`malloc`][LeaAlloc::malloc]. Returns
    /// null for a non-power-of-two alignment, a zero `size`, or an
    /// exhausted arena.
    pub fn memalign(&self, align: usize, size: usize) -> *mut u8 {
        if align <= ALIGNMENT {
            return self.malloc(size);
        }
        if !align.is_power_of_two() || size == 0 || size > MAX_REQUEST {
            return ptr::null_mut();
        }
        let align = Bytes(align);
        let size = Bytes(size);
        unsafe {
            self.with_heap(|heap| unsafe {
                heap.validate_all();
                let result = heap.memalign_impl(align, size);
                heap.validate_all();
                match result {
                    Ok(payload) => payload.as_ptr(),
                    Err(AllocError) => ptr::null_mut(),
                }
            })
        }
    }

    /// POSIX-flavoured aligned allocation.
    ///
    /// On success stores the new payload in `*memptr` and returns 0.
    /// Returns [`EINVAL`] when `align` is not a power of two or not a
    /// multiple of the word size, and [`ENOMEM`] when memory is exhausted.
    /// A zero `size` stores null and succeeds.
    ///
    /// # Safety
    ///
    /// `memptr` must be valid for writes.
    pub unsafe fn posix_memalign(&self, memptr: *mut *mut u8, align: usize, size: usize) -> i32 {
        if !align.is_power_of_two() || align % mem::size_of::<usize>() != 0 {
            return EINVAL;
        }
        if size == 0 {
            *memptr = ptr::null_mut();
            return 0;
        }
        let ptr = self.memalign(align, size);
        if ptr.is_null() {
            return ENOMEM;
        }
        *memptr = ptr;
        0
    }

    /// Walk the heap once and report usage statistics.
    pub fn mallinfo(&self) -> Mallinfo {
        unsafe {
            self.with_heap(|heap| unsafe {
                heap.validate_all();
                heap.mallinfo_impl()
            })
        }
    }

    /// Forget every region and free list, as if freshly constructed.
    ///
    /// Heap space grown so far is abandoned, not reused. This is a test
    /// hook.
    ///
    /// # Safety
    ///
    /// There must be no live allocations from this allocator.
    pub unsafe fn blank_slate(&self) {
        self.with_heap(|heap| heap.blank_slate_impl());
    }
}

unsafe impl GlobalAlloc for LeaAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() <= ALIGNMENT {
            self.malloc(layout.size())
        } else {
            self.memalign(layout.align(), layout.size())
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.free(ptr);
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.alloc(layout);
        if !ptr.is_null() {
            ptr::write_bytes(ptr, 0, layout.size());
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() <= ALIGNMENT {
            return LeaAlloc::realloc(self, ptr, new_size);
        }
        // An in-place resize keeps the address, but a moved block must land
        // on the original alignment again, so over-aligned resizes go
        // through memalign.
        let new_ptr = self.memalign(layout.align(), new_size);
        if !new_ptr.is_null() {
            ptr::copy_nonoverlapping(ptr, new_ptr, cmp::min(layout.size(), new_size));
            self.free(ptr);
        }
        new_ptr
    }
}
