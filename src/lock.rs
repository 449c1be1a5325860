//! Keeping memory out of swap.
//!
//! A [`SecureBox`] asks a [`MemLocker`] to pin its region into physical
//! memory right after the value is moved in, and to release that pin right
//! before the region is unmapped. [`SysMemLocker`], the default, uses
//! `mlock`/`munlock` on unix and `VirtualLock`/`VirtualUnlock` on windows.
//!
//! The amount of memory a process may lock is limited: on Linux by
//! `RLIMIT_MEMLOCK` (often only 64 KiB or 8 MiB for unprivileged processes),
//! on windows by the minimum working set size. Every secure box locks at least
//! one whole page, see [`page_size`].
//!
//! [`SecureBox`]: crate::SecureBox

use crate::internals::mem;
use core::ptr::NonNull;
use std::io;

pub use crate::internals::mem::page_size;

/// Strategy for excluding memory from paging.
///
/// # Security
/// An implementor that reports success from [`MemLocker::lock`] without
/// actually pinning the memory voids the no-swap guarantee of every box using
/// it. Implementations other than [`SysMemLocker`] are meant for wrapping it,
/// e.g. to observe or fail the calls in tests.
pub trait MemLocker {
    /// Lock the `len` bytes at `ptr` into physical memory.
    ///
    /// # Errors
    /// Returns the operating system error if the memory could not be locked,
    /// for example because the process exceeded its lock limit.
    ///
    /// # Safety
    /// `ptr` must be the page aligned start of a live mapping of at least
    /// `len` bytes, with `len` a multiple of the page size.
    unsafe fn lock(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()>;

    /// Unlock memory previously locked with [`MemLocker::lock`].
    ///
    /// When a box is released this is called after the region has been
    /// zeroized and before it is unmapped, so the `len` bytes at `ptr` are
    /// still readable during the call.
    ///
    /// # Errors
    /// Returns the operating system error if the memory could not be unlocked.
    ///
    /// # Safety
    /// `ptr` and `len` must be exactly the arguments of an earlier successful
    /// call to [`MemLocker::lock`] on the same locker, and the mapping must
    /// still be live.
    unsafe fn unlock(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()>;
}

impl<L: MemLocker + ?Sized> MemLocker for &L {
    unsafe fn lock(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: the caller must uphold the safety contract of `L::lock`
        unsafe { (**self).lock(ptr, len) }
    }

    unsafe fn unlock(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: the caller must uphold the safety contract of `L::unlock`
        unsafe { (**self).unlock(ptr, len) }
    }
}

/// The operating system's page locking calls.
#[derive(Debug, Copy, Clone, Default)]
pub struct SysMemLocker;

impl MemLocker for SysMemLocker {
    unsafe fn lock(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: the caller must uphold the safety contract
        unsafe { mem::lock(ptr, len) }
    }

    unsafe fn unlock(&self, ptr: NonNull<u8>, len: usize) -> io::Result<()> {
        // SAFETY: the caller must uphold the safety contract
        unsafe { mem::unlock(ptr, len) }
    }
}
