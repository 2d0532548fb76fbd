//! Segregated free lists, one per power-of-two size class.
//!
//! The list at index `k` holds free regions whose payload capacity lies in
//! `[2^k, 2^(k+1))`. Classes below the minimum allocation unit can never
//! have members; classes are capped at the word width, so on the 32-bit
//! targets this allocator is built for there are 32 of them. Lists are
//! doubly linked through the [`FreeLinks`] pair in each member's payload
//! area, pushed LIFO so the most recently freed region is found first.

use core::ptr;

use memory_units::Bytes;

use crate::const_init::ConstInit;
use crate::region::{self, Region};
use crate::ALLOC_UNIT;

pub(crate) const NUM_FREE_LISTS: usize = usize::BITS as usize;

/// Index of the class holding the smallest regions we ever create.
pub(crate) const MIN_FREE_LIST_INDEX: usize = ALLOC_UNIT.trailing_zeros() as usize;

pub(crate) fn floor_log2(x: usize) -> usize {
    extra_assert!(x > 0);
    (usize::BITS - 1 - x.leading_zeros()) as usize
}

/// The class a region of payload capacity `size` belongs in.
pub(crate) fn index_containing(size: Bytes) -> usize {
    let clamped = if size.0 < ALLOC_UNIT { ALLOC_UNIT } else { size.0 };
    let index = floor_log2(clamped);
    extra_assert!(index >= MIN_FREE_LIST_INDEX);
    extra_assert!(index < NUM_FREE_LISTS);
    index
}

/// The lowest class whose members are all guaranteed to hold `size` bytes.
///
/// For a power of two the containing class already guarantees that; any
/// other size needs the class above. May equal `NUM_FREE_LISTS` for sizes
/// near the top of the address space, in which case no class can guarantee
/// a fit and only the speculative lookback remains.
pub(crate) fn index_big_enough(size: Bytes) -> usize {
    let index = index_containing(size);
    if size.0.is_power_of_two() {
        index
    } else {
        index + 1
    }
}

/// Smallest payload capacity admitted to the class at `index`.
pub(crate) fn min_size_for_index(index: usize) -> usize {
    if index >= usize::BITS as usize {
        usize::MAX
    } else {
        1 << index
    }
}

/// Exclusive upper bound on payload capacities in the class at `index`.
pub(crate) fn max_size_for_index(index: usize) -> usize {
    min_size_for_index(index + 1)
}

pub(crate) struct FreeLists {
    heads: [*mut Region; NUM_FREE_LISTS],
}

impl ConstInit for FreeLists {
    const INIT: FreeLists = FreeLists {
        heads: [ptr::null_mut(); NUM_FREE_LISTS],
    };
}

impl FreeLists {
    pub(crate) fn head(&self, index: usize) -> *mut Region {
        self.heads[index]
    }

    pub(crate) fn reset(&mut self) {
        self.heads = [ptr::null_mut(); NUM_FREE_LISTS];
    }

    /// Push `region` onto the head of the class its capacity belongs in.
    pub(crate) unsafe fn insert(&mut self, region: *mut Region) {
        extra_assert!((*region).is_free());
        let index = index_containing((*region).max_payload());
        let head = self.heads[index];
        let links = region::free_links(region);
        (*links).prev = ptr::null_mut();
        (*links).next = head;
        if !head.is_null() {
            (*region::free_links(head)).prev = region;
        }
        self.heads[index] = region;
    }

    /// Unlink `region` from the one list it is on.
    pub(crate) unsafe fn remove(&mut self, region: *mut Region) {
        extra_assert!((*region).is_free());
        let index = index_containing((*region).max_payload());
        let links = region::free_links(region);
        if self.heads[index] == region {
            self.heads[index] = (*links).next;
        }
        if !(*links).prev.is_null() {
            (*region::free_links((*links).prev)).next = (*links).next;
        }
        if !(*links).next.is_null() {
            (*region::free_links((*links).next)).prev = (*links).prev;
        }
    }
}
