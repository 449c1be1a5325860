//! Small utilities used in other parts of the crate.
//!
//! Mainly page arithmetic and stable replacements for nightly only
//! functionality.

use mirai_annotations::debug_checked_precondition;

#[cfg(not(feature = "nightly_core_intrinsics"))]
pub(crate) fn unlikely(b: bool) -> bool {
    b
}

#[cfg(feature = "nightly_core_intrinsics")]
pub(crate) fn unlikely(b: bool) -> bool {
    core::intrinsics::unlikely(b)
}

/// Align pointer `ptr` upwards to `align`. The return value is a null-pointer
/// iff `ptr` cannot be aligned to `align`. The resulting pointer has the same
/// provenance as `ptr`.
///
/// # Safety
/// `align` must be a power of two (2). The resulting pointer is potentially
/// null and has the same provenance as `ptr` so be careful that it is in the
/// required memory range before dereferencing it.
pub(crate) unsafe fn align_ptr_mut(ptr: *mut u8, align: usize) -> *mut u8 {
    debug_checked_precondition!(align.is_power_of_two());
    // align `ptr` to `align` or `0` if not possible; as a usize
    // `align - 1` doesn't wrap as `align` is a power of 2, so >= 1
    let aligned: usize = (ptr as usize).wrapping_add(align - 1) & !(align - 1);
    // compute the difference with the original pointer
    let offset = aligned.wrapping_sub(ptr as usize);
    // add the offset to the original pointer; this way we keep the original pointer
    // provenance
    ptr.wrapping_add(offset)
}

/// Length in bytes of the smallest run of whole pages that can hold a value of
/// `size` bytes and alignment `align`, when the run itself starts on a page
/// boundary.
///
/// Always at least one page, also for zero sized values. Returns `None` if the
/// length does not fit an `isize`.
///
/// `align` and `page_size` must be powers of two.
pub(crate) fn region_len(size: usize, align: usize, page_size: usize) -> Option<usize> {
    debug_checked_precondition!(align.is_power_of_two());
    debug_checked_precondition!(page_size.is_power_of_two());
    // the region is page aligned, so only alignment beyond a page needs slack
    let slack = align.saturating_sub(page_size);
    let needed = size.checked_add(slack)?.max(1);
    let rounded = needed.checked_add(page_size - 1)? & !(page_size - 1);
    if unlikely(rounded > isize::MAX as usize) {
        return None;
    }
    Some(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_len_rounds_to_pages() {
        assert_eq!(region_len(1, 1, 4096), Some(4096));
        assert_eq!(region_len(4096, 8, 4096), Some(4096));
        assert_eq!(region_len(4097, 8, 4096), Some(8192));
        assert_eq!(region_len(32, 32, 16384), Some(16384));
    }

    #[test]
    fn region_len_zero_sized() {
        assert_eq!(region_len(0, 1, 4096), Some(4096));
    }

    #[test]
    fn region_len_large_align() {
        // a 16 KiB aligned value needs 12 KiB of slack on a 4 KiB page system
        assert_eq!(region_len(8, 16384, 4096), Some(16384));
        assert_eq!(region_len(4097, 16384, 4096), Some(16384 + 4096));
    }

    #[test]
    fn region_len_overflow() {
        assert_eq!(region_len(usize::MAX, 1, 4096), None);
        assert_eq!(region_len(isize::MAX as usize, 1, 4096), None);
        assert_eq!(region_len(usize::MAX - 4096, 8192, 4096), None);
    }

    #[test]
    fn align_ptr_mut_aligns_up() {
        let mut buf = [0_u8; 64];
        let base: *mut u8 = buf.as_mut_ptr();
        for offset in 0..16 {
            let ptr = base.wrapping_add(offset);
            let aligned = unsafe { align_ptr_mut(ptr, 16) };
            assert_eq!(aligned as usize % 16, 0);
            assert!(aligned as usize >= ptr as usize);
            assert!((aligned as usize) - (ptr as usize) < 16);
        }
    }
}
