//! Program-break backend for Windows.
//!
//! `VirtualAlloc` separates reserving address space from committing pages,
//! which maps nicely onto a growing break: reserve one large range up
//! front, then commit it chunk by chunk as the break advances.

use core::cell::UnsafeCell;
use core::ptr::{self, NonNull};

use memory_units::Bytes;
use winapi::shared::ntdef::NULL;
use winapi::um::memoryapi::VirtualAlloc;
use winapi::um::synchapi::{
    AcquireSRWLockExclusive, ReleaseSRWLockExclusive, SRWLOCK, SRWLOCK_INIT,
};
use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE};

use crate::const_init::ConstInit;
use crate::AllocError;

const RESERVATION_SIZE: usize = 1 << (if usize::BITS >= 64 { 32 } else { 30 });

// Commit in allocation-granularity chunks to keep the VirtualAlloc call
// count down.
const COMMIT_CHUNK: usize = 1 << 16;

pub(crate) struct Arena {
    base: *mut u8,
    committed: usize,
    brk: usize,
}

impl ConstInit for Arena {
    const INIT: Arena = Arena {
        base: ptr::null_mut(),
        committed: 0,
        brk: 0,
    };
}

impl Arena {
    /// Extend the linear space by `delta` bytes and return the previous end.
    pub(crate) unsafe fn grow(&mut self, delta: Bytes) -> Result<NonNull<u8>, AllocError> {
        if self.base.is_null() {
            let base = VirtualAlloc(NULL, RESERVATION_SIZE, MEM_RESERVE, PAGE_NOACCESS);
            if base.is_null() {
                return Err(AllocError);
            }
            self.base = base as *mut u8;
        }
        let old = self.brk;
        let new = old.checked_add(delta.0).ok_or(AllocError)?;
        if new > RESERVATION_SIZE {
            return Err(AllocError);
        }
        if new > self.committed {
            let target = usize::min(
                RESERVATION_SIZE,
                (new + COMMIT_CHUNK - 1) & !(COMMIT_CHUNK - 1),
            );
            let committed = VirtualAlloc(
                self.base.add(self.committed) as _,
                target - self.committed,
                MEM_COMMIT,
                PAGE_READWRITE,
            );
            if committed.is_null() {
                return Err(AllocError);
            }
            self.committed = target;
        }
        self.brk = new;
        Ok(NonNull::new_unchecked(self.base.add(old)))
    }
}

/// Mutual exclusion for the allocator state, on top of a slim
/// reader/writer lock used in exclusive mode only. The lock guards nothing
/// by itself; the heap it protects lives next to it in the allocator value.
pub(crate) struct Lock {
    raw: UnsafeCell<SRWLOCK>,
}

impl Lock {
    pub(crate) const INIT: Lock = Lock {
        raw: UnsafeCell::new(SRWLOCK_INIT),
    };

    /// # Safety
    ///
    /// Not re-entrant.
    #[inline]
    pub(crate) unsafe fn acquire(&self) {
        AcquireSRWLockExclusive(self.raw.get());
    }

    /// # Safety
    ///
    /// The caller must hold the lock.
    #[inline]
    pub(crate) unsafe fn release(&self) {
        ReleaseSRWLockExclusive(self.raw.get());
    }
}
