//! OS-independent program-break backend: a fixed scratch array compiled
//! into the binary.
//!
//! The scratch size defaults to 32 MiB and can be set at build time through
//! the `LEA_ALLOC_STATIC_ARRAY_BACKEND_BYTES` environment variable.
//!
//! A break must stay contiguous within its arena, so the first arena to
//! grow claims all remaining scratch for itself; any further arena fails
//! its first growth. One allocator instance per process, in other words.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use memory_units::Bytes;
use spin::Mutex;

use crate::const_init::ConstInit;
use crate::AllocError;

const SCRATCH_LEN_BYTES: usize = include!(concat!(
    env!("OUT_DIR"),
    "/lea_alloc_static_array_backend_size_bytes.txt"
));

#[repr(align(4096))]
struct ScratchHeap(UnsafeCell<[u8; SCRATCH_LEN_BYTES]>);

unsafe impl Sync for ScratchHeap {}

static SCRATCH_HEAP: ScratchHeap = ScratchHeap(UnsafeCell::new([0; SCRATCH_LEN_BYTES]));

// Offset of the first byte of scratch no arena has claimed yet.
static UNCLAIMED: Mutex<usize> = Mutex::new(0);

pub(crate) struct Arena {
    start: usize,
    len: usize,
    brk: usize,
    claimed: bool,
}

impl ConstInit for Arena {
    const INIT: Arena = Arena {
        start: 0,
        len: 0,
        brk: 0,
        claimed: false,
    };
}

impl Arena {
    /// Extend the linear space by `delta` bytes and return the previous end.
    pub(crate) unsafe fn grow(&mut self, delta: Bytes) -> Result<NonNull<u8>, AllocError> {
        if !self.claimed {
            let mut unclaimed = UNCLAIMED.lock();
            self.start = *unclaimed;
            self.len = SCRATCH_LEN_BYTES - *unclaimed;
            *unclaimed = SCRATCH_LEN_BYTES;
            self.claimed = true;
        }
        let old = self.brk;
        let new = old.checked_add(delta.0).ok_or(AllocError)?;
        if new > self.len {
            return Err(AllocError);
        }
        self.brk = new;
        let base = SCRATCH_HEAP.0.get() as *mut u8;
        Ok(NonNull::new_unchecked(base.add(self.start + old)))
    }
}

/// Mutual exclusion for the allocator state, on top of a spin lock. The
/// lock guards nothing by itself; the heap it protects lives next to it in
/// the allocator value, so the guard is forgotten on acquire and the lock
/// force-released afterwards.
pub(crate) struct Lock {
    raw: Mutex<()>,
}

impl Lock {
    pub(crate) const INIT: Lock = Lock {
        raw: Mutex::new(()),
    };

    /// # Safety
    ///
    /// Not re-entrant; a second acquire on the same thread spins forever.
    #[inline]
    pub(crate) unsafe fn acquire(&self) {
        core::mem::forget(self.raw.lock());
    }

    /// # Safety
    ///
    /// The caller must hold the lock.
    #[inline]
    pub(crate) unsafe fn release(&self) {
        self.raw.force_unlock();
    }
}
