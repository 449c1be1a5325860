//! Windows `VirtualAlloc` memory pages, locked with `VirtualLock`.

use super::Region;

use core::ffi::c_void;
use core::ptr::NonNull;
use std::io;

/// Return the page size on the running system by querying kernel32.lib.
pub fn page_size() -> usize {
    use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    let mut sysinfo = SYSTEM_INFO::default();
    // SAFETY: `sysinfo` is a valid (all zeros) `SYSTEM_INFO` to be filled in
    unsafe { GetSystemInfo(&mut sysinfo) };
    // the pagesize must always fit in a `usize` (on windows it is a `u32`)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        sysinfo.dwPageSize as usize
    }
}

/// Keep the OS error code so callers can match on [`io::Error::kind`].
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
fn to_io_error(err: windows::core::Error) -> io::Error {
    // HRESULT_FROM_WIN32 puts the win32 error code in facility 7
    let hresult = err.code().0 as u32;
    if hresult & 0xFFFF_0000 == 0x8007_0000 {
        io::Error::from_raw_os_error((hresult & 0xFFFF) as i32)
    } else {
        io::Error::from(err)
    }
}

impl Region {
    /// Reserve and commit `len` bytes of fresh memory with `VirtualAlloc`.
    ///
    /// `len` must be a non-zero multiple of the page size.
    ///
    /// # Errors
    /// Returns the `VirtualAlloc` error.
    pub fn map(len: usize) -> io::Result<Self> {
        use windows::Win32::System::Memory::{
            VirtualAlloc, MEM_COMMIT, MEM_RESERVE, PAGE_PROTECTION_FLAGS, PAGE_READWRITE,
            VIRTUAL_ALLOCATION_TYPE,
        };

        let alloc_type: VIRTUAL_ALLOCATION_TYPE = MEM_RESERVE | MEM_COMMIT;
        let protect: PAGE_PROTECTION_FLAGS = PAGE_READWRITE;

        // SAFETY: we ask for new pages at an address of the system's choosing, so no
        // existing memory is affected
        let ptr: *mut c_void = unsafe { VirtualAlloc(None, len, alloc_type, protect) };
        let Some(ptr) = NonNull::new(ptr.cast::<u8>()) else {
            return Err(io::Error::last_os_error());
        };
        log::trace!("mapped secure region of {len} bytes");

        // SAFETY: `ptr` is a fresh allocation of `len` bytes that nothing else owns
        Ok(unsafe { Region::from_raw_parts(ptr, len) })
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        use windows::Win32::System::Memory::{VirtualFree, MEM_RELEASE};

        // SAFETY: we allocated this region in `map` and own it, so it is safe to
        // release now
        let res = unsafe { VirtualFree(self.as_ptr_mut().cast::<c_void>(), 0, MEM_RELEASE) };
        if let Err(err) = res {
            log::error!("could not release secure region of {} bytes: {err}", self.len());
        }
    }
}

/// Lock the `len` bytes at `ptr` into physical memory with `VirtualLock`.
///
/// The number of pages a process can lock is bounded by its minimum working
/// set size.
///
/// # Safety
/// `ptr` must point to committed memory of at least `len` bytes.
pub unsafe fn lock(ptr: NonNull<u8>, len: usize) -> io::Result<()> {
    use windows::Win32::System::Memory::VirtualLock;

    // SAFETY: the caller must uphold the safety contract
    unsafe { VirtualLock(ptr.as_ptr().cast::<c_void>(), len) }.map_err(to_io_error)
}

/// Undo [`lock`] with `VirtualUnlock`.
///
/// # Safety
/// `ptr` must point to committed memory of at least `len` bytes.
pub unsafe fn unlock(ptr: NonNull<u8>, len: usize) -> io::Result<()> {
    use windows::Win32::System::Memory::VirtualUnlock;

    // SAFETY: the caller must uphold the safety contract
    unsafe { VirtualUnlock(ptr.as_ptr().cast::<c_void>(), len) }.map_err(to_io_error)
}
