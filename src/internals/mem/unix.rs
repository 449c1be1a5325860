//! Unix `mmap` private anonymous memory pages, locked with `mlock`.

use super::Region;

use core::ffi::c_void;
use core::ptr::NonNull;
use std::io;

/// Return the page size on the running system using the `rustix` crate.
pub fn page_size() -> usize {
    rustix::param::page_size()
}

impl Region {
    /// Map `len` bytes of fresh anonymous memory, readable and writable.
    ///
    /// Where available the mapping is made with `MAP_NORESERVE`, which only
    /// skips reserving swap space for it; the pages can still be swapped out
    /// until they are locked with [`lock`]. On FreeBSD and DragonFly, which
    /// lack that flag, the pages are instead kept out of core dumps with
    /// `MAP_NOCORE`.
    ///
    /// `len` must be a non-zero multiple of the page size.
    ///
    /// # Errors
    /// Returns the `mmap` error.
    pub fn map(len: usize) -> io::Result<Self> {
        use rustix::mm::{MapFlags, ProtFlags};

        let prot = ProtFlags::READ | ProtFlags::WRITE;
        cfg_if::cfg_if! {
            if #[cfg(target_os = "redox")] {
                let flags = MapFlags::PRIVATE;
            } else if #[cfg(any(target_os = "freebsd", target_os = "dragonfly"))] {
                let flags = MapFlags::PRIVATE | MapFlags::NOCORE;
            } else {
                let flags = MapFlags::PRIVATE | MapFlags::NORESERVE;
            }
        }

        // SAFETY: we ask for a new mapping at an address of the kernel's choosing,
        // so no existing memory is affected
        let ptr: *mut c_void =
            unsafe { rustix::mm::mmap_anonymous(core::ptr::null_mut(), len, prot, flags) }?;
        log::trace!("mapped secure region of {len} bytes");

        // SAFETY: if `mmap` is successful, the result is non-null
        let ptr = unsafe { NonNull::new_unchecked(ptr.cast::<u8>()) };
        // SAFETY: `ptr` is a fresh mapping of `len` bytes that nothing else owns
        Ok(unsafe { Region::from_raw_parts(ptr, len) })
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: we mapped this region in `map` and own it, so it is safe to
        // unmap now. Any lock still held is released along with the mapping.
        let res = unsafe { rustix::mm::munmap(self.as_ptr_mut().cast::<c_void>(), self.len()) };
        if let Err(err) = res {
            log::error!("could not unmap secure region of {} bytes: {err}", self.len());
        }
    }
}

/// Lock the `len` bytes at `ptr` into physical memory with `mlock`.
///
/// After success the pages are resident and will not be written to swap,
/// except on hibernation. For unprivileged processes the amount of memory that
/// can be locked is limited by `RLIMIT_MEMLOCK`.
///
/// # Safety
/// `ptr` must point to a mapping of at least `len` bytes.
pub unsafe fn lock(ptr: NonNull<u8>, len: usize) -> io::Result<()> {
    // SAFETY: the caller must uphold the safety contract
    unsafe { rustix::mm::mlock(ptr.as_ptr().cast::<c_void>(), len) }?;
    Ok(())
}

/// Undo [`lock`] with `munlock`.
///
/// # Safety
/// `ptr` must point to a mapping of at least `len` bytes.
pub unsafe fn unlock(ptr: NonNull<u8>, len: usize) -> io::Result<()> {
    // SAFETY: the caller must uphold the safety contract
    unsafe { rustix::mm::munlock(ptr.as_ptr().cast::<c_void>(), len) }?;
    Ok(())
}
