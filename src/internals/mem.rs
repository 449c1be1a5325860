//! Dedicated page mappings and the operating system calls to lock them.

use crate::macros::debug_precondition_page_range;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::sync::OnceLock;

/// A run of whole memory pages mapped for a single secure box.
///
/// The pages come straight from the operating system, not from the global
/// allocator, so the region starts on a page boundary and shares its pages
/// with nothing else. Dropping a `Region` only unmaps it; wiping and unlocking
/// the memory beforehand is up to the owner.
pub struct Region {
    /// Pointer to the first byte of the first page.
    ptr: NonNull<u8>,
    /// Length of the mapping in bytes, a non-zero multiple of the page size.
    len: usize,
    /// This type owns the mapped pages as raw bytes
    _phantom_pagemem: PhantomData<[u8]>,
}

impl Region {
    /// # Safety
    /// `ptr` must be the start of a live mapping of exactly `len` bytes made
    /// by this module's platform backend, which the new `Region` takes over.
    unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize) -> Self {
        debug_precondition_page_range!(ptr.as_ptr(), len, page_size());
        Self {
            ptr,
            len,
            _phantom_pagemem: PhantomData,
        }
    }

    /// Get [`NonNull`] pointer to the start of the region.
    pub fn ptr_nonnull(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Get a mutable pointer to the start of the region.
    pub fn as_ptr_mut(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Length of the region in bytes.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl core::fmt::Debug for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Region")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

cfg_if::cfg_if! {
    if #[cfg(miri)] {
        mod miri;
        use self::miri as sys;
    } else if #[cfg(unix)] {
        mod unix;
        use self::unix as sys;
    } else if #[cfg(windows)] {
        mod windows;
        use self::windows as sys;
    }
}

pub use sys::{lock, unlock};

/// Page size of the running system, queried once and then cached.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(sys::page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        let page_size = page_size();
        assert!(page_size.is_power_of_two());
        assert!(page_size >= 4096);
        assert_eq!(page_size, super::page_size());
    }

    #[test]
    fn map_is_page_aligned_and_zeroed() {
        let len = 2 * page_size();
        let region = Region::map(len).expect("mapping failed");
        assert_eq!(region.len(), len);
        assert_eq!(region.as_ptr_mut() as usize % page_size(), 0);
        let bytes = unsafe { core::slice::from_raw_parts(region.as_ptr_mut(), len) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    #[cfg_attr(miri, ignore)] // page locking is not modelled by miri
    fn lock_and_unlock_region() {
        let region = Region::map(page_size()).expect("mapping failed");
        unsafe {
            lock(region.ptr_nonnull(), region.len()).expect("locking failed");
            region.as_ptr_mut().write(0x5A);
            assert_eq!(region.as_ptr_mut().read(), 0x5A);
            unlock(region.ptr_nonnull(), region.len()).expect("unlocking failed");
        }
    }
}
