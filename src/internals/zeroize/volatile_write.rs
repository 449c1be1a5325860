//! Zeroization by plain volatile stores; pure Rust and available everywhere.

use crate::macros::precondition_memory_range;
use mirai_annotations::debug_checked_precondition_eq;

/// Zeroize `len` bytes at `ptr` one volatile byte store at a time.
///
/// # Safety
/// The caller *must* ensure that `ptr` is valid for writes of `len` bytes, see
/// the [`std::ptr`] documentation. In particular this function is not atomic.
pub unsafe fn volatile_write_zeroize(ptr: *mut u8, len: usize) {
    precondition_memory_range!(ptr, len);
    for offset in 0..len {
        // SAFETY: `offset < len` and `ptr` is valid for `len` bytes
        unsafe { ptr.add(offset).write_volatile(0_u8) };
    }
}

/// Zeroize `len` bytes at `ptr` with volatile 8 byte stores, finishing the
/// tail (at most 7 bytes) one byte at a time.
///
/// Regions handed out by [`crate::internals::mem`] are page aligned and a
/// whole number of pages long, so for them the tail loop never runs.
///
/// # Safety
/// The caller *must* ensure that `ptr` is valid for writes of `len` bytes, see
/// the [`std::ptr`] documentation. In particular this function is not atomic.
///
/// Furthermore, `ptr` *must* be at least 8 byte aligned.
pub unsafe fn volatile_write8_zeroize(ptr: *mut u8, len: usize) {
    precondition_memory_range!(ptr, len);
    debug_checked_precondition_eq!((ptr as usize) % 8, 0);

    let words = len / 8;
    let word_ptr = ptr.cast::<u64>();
    for i in 0..words {
        // SAFETY: `8 * i + 8 <= len` so the store stays in bounds, and `ptr` is
        // 8 byte aligned by caller contract so every word is aligned as well
        unsafe { word_ptr.add(i).write_volatile(0_u64) };
    }
    for offset in (words * 8)..len {
        // SAFETY: `offset < len`
        unsafe { ptr.add(offset).write_volatile(0_u8) };
    }
}
