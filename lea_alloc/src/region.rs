//! In-band region metadata.
//!
//! Every region starts with a [`Region`] header and is followed by its
//! payload. The header occupies one [`ALIGNMENT`]-sized slot regardless of
//! how many of its bytes the three fields actually use, which keeps payloads
//! aligned for free. The region *after* a region is not stored anywhere: it
//! is derived from `total_size`, with the heap's `last_region` marking the
//! end of the line. Only the backwards link is in memory.
//!
//! When a region is free, the first bytes of its payload are reinterpreted
//! as a [`FreeLinks`] pair. That aliasing is confined to this module: the
//! rest of the crate goes through [`free_links`].

use core::ptr;

use memory_units::Bytes;

use crate::{ALIGNMENT, HEADER_SIZE};

/// Header describing one region of the heap.
///
/// `used_payload` doubles as the state tag: zero means free (payloads of
/// zero bytes are never handed out).
#[repr(C)]
pub(crate) struct Region {
    total_size: usize,
    used_payload: usize,
    prev: *mut Region,
}

/// The doubly-linked free-list node living in a free region's payload area.
#[repr(C)]
pub(crate) struct FreeLinks {
    pub(crate) prev: *mut Region,
    pub(crate) next: *mut Region,
}

#[test]
fn region_header_fits_in_its_slot() {
    // Safety and correctness depend on the header fitting in the metadata
    // slot and on payload offsets preserving alignment.
    assert!(core::mem::size_of::<Region>() <= ALIGNMENT);
    assert!(core::mem::align_of::<Region>() <= ALIGNMENT);
    assert!(ALIGNMENT.is_power_of_two());
}

#[test]
fn free_links_fit_in_minimum_payload() {
    assert!(core::mem::size_of::<FreeLinks>() <= crate::ALLOC_UNIT);
    assert!(core::mem::align_of::<FreeLinks>() <= ALIGNMENT);
}

impl Region {
    pub(crate) fn total_size(&self) -> Bytes {
        Bytes(self.total_size)
    }

    pub(crate) fn set_total_size(&mut self, total_size: Bytes) {
        self.total_size = total_size.0;
    }

    pub(crate) fn grow_total(&mut self, by: Bytes) {
        self.total_size += by.0;
    }

    pub(crate) fn shrink_total(&mut self, by: Bytes) {
        extra_assert!(by.0 < self.total_size);
        self.total_size -= by.0;
    }

    /// Payload capacity: everything past the header.
    pub(crate) fn max_payload(&self) -> Bytes {
        extra_assert!(self.total_size >= HEADER_SIZE.0);
        Bytes(self.total_size - HEADER_SIZE.0)
    }

    pub(crate) fn used_payload(&self) -> Bytes {
        Bytes(self.used_payload)
    }

    pub(crate) fn set_used_payload(&mut self, size: Bytes) {
        extra_assert!(size.0 > 0);
        self.used_payload = size.0;
    }

    pub(crate) fn set_free(&mut self) {
        self.used_payload = 0;
    }

    pub(crate) fn is_free(&self) -> bool {
        self.used_payload == 0
    }

    /// The region immediately below this one in address order, or null if
    /// this is the first region.
    pub(crate) fn prev(&self) -> *mut Region {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: *mut Region) {
        self.prev = prev;
    }
}

/// Write a fresh header. The back link starts out null; linking into the
/// region list is the caller's job.
pub(crate) unsafe fn init(region: *mut Region, total_size: Bytes, used_payload: Bytes) {
    (*region).total_size = total_size.0;
    (*region).used_payload = used_payload.0;
    (*region).prev = ptr::null_mut();
}

/// First payload byte of `region`.
pub(crate) unsafe fn payload_of(region: *mut Region) -> *mut u8 {
    (region as *mut u8).add(HEADER_SIZE.0)
}

/// Recover the region from a payload pointer handed out earlier.
pub(crate) unsafe fn from_payload(payload: *mut u8) -> *mut Region {
    payload.sub(HEADER_SIZE.0) as *mut Region
}

/// One past the last byte of `region`; where its successor starts, if any.
pub(crate) unsafe fn end_of(region: *mut Region) -> *mut u8 {
    (region as *mut u8).add((*region).total_size)
}

/// The free-list node aliasing a free region's payload.
pub(crate) unsafe fn free_links(region: *mut Region) -> *mut FreeLinks {
    extra_assert!((*region).is_free());
    payload_of(region) as *mut FreeLinks
}
