//! Miri shims for page mapping and locking. Not accurate, but better than
//! nothing.

use super::Region;
use core::ptr::NonNull;
use std::alloc::Layout;
use std::io;

/// Page size shim for miri.
#[cfg(not(tarpaulin_include))]
pub fn page_size() -> usize {
    4096
}

fn region_layout(len: usize) -> io::Result<Layout> {
    Layout::from_size_align(len, page_size())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
}

#[cfg(not(tarpaulin_include))]
impl Region {
    pub fn map(len: usize) -> io::Result<Self> {
        let layout = region_layout(len)?;
        // SAFETY: `len` is non-zero as required by `Region`
        let ptr: *mut u8 = unsafe { std::alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            return Err(io::ErrorKind::OutOfMemory.into());
        };
        // SAFETY: `ptr` is a fresh, page aligned allocation of `len` bytes
        Ok(unsafe { Region::from_raw_parts(ptr, len) })
    }
}

#[cfg(not(tarpaulin_include))]
impl Drop for Region {
    fn drop(&mut self) {
        match region_layout(self.len()) {
            // SAFETY: we allocated this region in `map` with this very layout
            Ok(layout) => unsafe { std::alloc::dealloc(self.as_ptr_mut(), layout) },
            Err(err) => log::error!("could not release secure region: {err}"),
        }
    }
}

/// Locking shim for miri; always succeeds.
///
/// # Safety
/// `ptr` must point to an allocation of at least `len` bytes.
pub unsafe fn lock(_ptr: NonNull<u8>, _len: usize) -> io::Result<()> {
    Ok(())
}

/// Unlocking shim for miri; always succeeds.
///
/// # Safety
/// `ptr` must point to an allocation of at least `len` bytes.
pub unsafe fn unlock(_ptr: NonNull<u8>, _len: usize) -> io::Result<()> {
    Ok(())
}
