//! Program-break backend for unix systems.
//!
//! There is no portable way to claim the real program break, so each arena
//! reserves one large anonymous mapping up front and bumps a private break
//! inside it. The pages are not committed until touched, which makes the
//! reservation cheap; it is sized like the 32-bit address space this
//! allocator models.

use core::cell::UnsafeCell;
use core::ptr::{self, NonNull};

use memory_units::Bytes;

use crate::const_init::ConstInit;
use crate::AllocError;

const RESERVATION_SIZE: usize = 1 << (if usize::BITS >= 64 { 32 } else { 30 });

pub(crate) struct Arena {
    base: *mut u8,
    brk: usize,
}

impl ConstInit for Arena {
    const INIT: Arena = Arena {
        base: ptr::null_mut(),
        brk: 0,
    };
}

impl Arena {
    /// Extend the linear space by `delta` bytes and return the previous end.
    ///
    /// Consecutive grows hand out contiguous bytes; a zero `delta` reads the
    /// current end. Fails once the reservation is exhausted, leaving the
    /// break where it was.
    pub(crate) unsafe fn grow(&mut self, delta: Bytes) -> Result<NonNull<u8>, AllocError> {
        if self.base.is_null() {
            self.base = reserve()?;
        }
        let old = self.brk;
        let new = old.checked_add(delta.0).ok_or(AllocError)?;
        if new > RESERVATION_SIZE {
            return Err(AllocError);
        }
        self.brk = new;
        Ok(NonNull::new_unchecked(self.base.add(old)))
    }
}

unsafe fn reserve() -> Result<*mut u8, AllocError> {
    let flags = libc::MAP_PRIVATE | libc::MAP_ANON;
    #[cfg(target_os = "linux")]
    let flags = flags | libc::MAP_NORESERVE;
    let addr = libc::mmap(
        ptr::null_mut(),
        RESERVATION_SIZE,
        libc::PROT_READ | libc::PROT_WRITE,
        flags,
        -1,
        0,
    );
    if addr == libc::MAP_FAILED {
        Err(AllocError)
    } else {
        Ok(addr as *mut u8)
    }
}

/// Mutual exclusion for the allocator state, on top of a process-local
/// pthread mutex. The lock guards nothing by itself; the heap it protects
/// lives next to it in the allocator value.
pub(crate) struct Lock {
    raw: UnsafeCell<libc::pthread_mutex_t>,
}

impl Lock {
    pub(crate) const INIT: Lock = Lock {
        raw: UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER),
    };

    /// # Safety
    ///
    /// Not re-entrant. The `pthread` return code is only checked when the
    /// "extra_assertions" feature is enabled.
    #[inline]
    pub(crate) unsafe fn acquire(&self) {
        let code = libc::pthread_mutex_lock(self.raw.get());
        extra_assert_eq!(code, 0, "pthread_mutex_lock should run OK");
    }

    /// # Safety
    ///
    /// The caller must hold the lock.
    #[inline]
    pub(crate) unsafe fn release(&self) {
        let code = libc::pthread_mutex_unlock(self.raw.get());
        extra_assert_eq!(code, 0, "pthread_mutex_unlock should run OK");
    }
}
