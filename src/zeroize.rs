//! Wiping a secure region before it goes back to the operating system.
//!
//! Every [`SecureBox`] carries a [`MemZeroizer`] and runs it over its whole
//! region, padding and alignment slack included, before the region is
//! unlocked and unmapped. The default is [`DefaultMemZeroizer`]; another one
//! can be picked with [`SecureBox::new_with`].
//!
//! Zeroizers write raw bytes. What they leave behind is not necessarily a
//! valid value of any type, which is fine for memory that is being released
//! and nothing else.
//!
//! [`SecureBox`]: crate::SecureBox
//! [`SecureBox::new_with`]: crate::SecureBox::new_with

use crate::internals::zeroize as internals;
use crate::macros::precondition_memory_range;
use mirai_annotations::{debug_checked_precondition, debug_checked_precondition_eq};

/// Overwrites memory with zeros in a way the compiler must keep.
///
/// # Security
/// Implementations may not use plain writes: a write to memory that is
/// released right afterwards is dead to the optimiser and can be removed.
pub trait MemZeroizer {
    /// Overwrite the `len` bytes at `ptr` with zeros.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `len` bytes (see [`std::ptr`]). The
    /// writes are not atomic, so nothing else may access the memory meanwhile.
    unsafe fn zeroize_mem(&self, ptr: *mut u8, len: usize);

    /// Like [`MemZeroizer::zeroize_mem`], with the promise that `ptr` is
    /// aligned to at least `align` bytes.
    ///
    /// Secure regions are page aligned, so releasing a box always calls this
    /// with the page size as `align`. Implementations without a faster aligned
    /// path keep the default, which ignores `align`.
    ///
    /// # Safety
    /// As for [`MemZeroizer::zeroize_mem`]. In addition `align` must be a
    /// power of two and `ptr` a multiple of it.
    unsafe fn zeroize_mem_minaligned(&self, ptr: *mut u8, len: usize, _align: usize) {
        precondition_memory_range!(ptr, len);
        // SAFETY: a stronger contract than that of `zeroize_mem`
        unsafe { self.zeroize_mem(ptr, len) }
    }
}

impl<Z: MemZeroizer + ?Sized> MemZeroizer for &Z {
    unsafe fn zeroize_mem(&self, ptr: *mut u8, len: usize) {
        // SAFETY: same contract as `Z::zeroize_mem`
        unsafe { (**self).zeroize_mem(ptr, len) }
    }

    unsafe fn zeroize_mem_minaligned(&self, ptr: *mut u8, len: usize, align: usize) {
        // SAFETY: same contract as `Z::zeroize_mem_minaligned`
        unsafe { (**self).zeroize_mem_minaligned(ptr, len, align) }
    }
}

cfg_if::cfg_if! {
    if #[cfg(miri)] {
        // no ffi under miri
        pub type DefaultMemZeroizer = VolatileWrite8Zeroizer;
    } else if #[cfg(feature = "nightly_core_intrinsics")] {
        /// The zeroizer a [`SecureBox`](crate::SecureBox) uses unless told
        /// otherwise. Which one this is depends on target and features.
        pub type DefaultMemZeroizer = VolatileMemsetZeroizer;
    } else if #[cfg(any(
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "macos",
        target_os = "ios",
        target_env = "gnu",
        target_env = "musl"
    ))] {
        /// The zeroizer a [`SecureBox`](crate::SecureBox) uses unless told
        /// otherwise. Which one this is depends on target and features.
        pub type DefaultMemZeroizer = LibcZeroizer;
    } else {
        /// The zeroizer a [`SecureBox`](crate::SecureBox) uses unless told
        /// otherwise. Which one this is depends on target and features.
        pub type DefaultMemZeroizer = VolatileWrite8Zeroizer;
    }
}

/// Wipes with the `volatile_set_memory` intrinsic. Needs a nightly compiler
/// and the `nightly_core_intrinsics` feature.
#[cfg(feature = "nightly_core_intrinsics")]
#[derive(Debug, Copy, Clone, Default)]
pub struct VolatileMemsetZeroizer;

#[cfg(feature = "nightly_core_intrinsics")]
impl MemZeroizer for VolatileMemsetZeroizer {
    unsafe fn zeroize_mem(&self, ptr: *mut u8, len: usize) {
        precondition_memory_range!(ptr, len);
        // SAFETY: `ptr` is valid for writes of `len` bytes by caller contract
        unsafe { internals::volatile_memset(ptr, 0, len) };
        fence();
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "macos",
        target_os = "ios",
        target_env = "gnu",
        target_env = "musl"
    ))] {
        /// Wipes with the C library's non-elidable memset: `explicit_bzero`,
        /// `explicit_memset` on NetBSD or `memset_s` on Apple targets.
        #[derive(Debug, Copy, Clone, Default)]
        pub struct LibcZeroizer;

        impl MemZeroizer for LibcZeroizer {
            unsafe fn zeroize_mem(&self, ptr: *mut u8, len: usize) {
                precondition_memory_range!(ptr, len);
                // SAFETY: `ptr` is valid for writes of `len` bytes by caller contract
                unsafe { internals::libc_explicit_bzero(ptr, len) };
                fence();
            }
        }
    }
}

/// Wipes one byte per volatile write. Portable, works under miri, and slow.
#[derive(Debug, Copy, Clone, Default)]
pub struct VolatileWriteZeroizer;

impl MemZeroizer for VolatileWriteZeroizer {
    unsafe fn zeroize_mem(&self, ptr: *mut u8, len: usize) {
        precondition_memory_range!(ptr, len);
        // SAFETY: `ptr` is valid for writes of `len` bytes by caller contract
        unsafe { internals::volatile_write_zeroize(ptr, len) };
        fence();
    }
}

/// Wipes eight bytes per volatile write where the memory is 8 byte aligned,
/// one byte per write elsewhere.
///
/// Page aligned regions always take the word path.
#[derive(Debug, Copy, Clone, Default)]
pub struct VolatileWrite8Zeroizer;

impl VolatileWrite8Zeroizer {
    /// # Safety
    /// `ptr` must be valid for writes of `len` bytes, and 8 byte aligned if
    /// `words` is set.
    unsafe fn wipe(ptr: *mut u8, len: usize, words: bool) {
        if words {
            // SAFETY: forwarded contract
            unsafe { internals::volatile_write8_zeroize(ptr, len) };
        } else {
            // SAFETY: forwarded contract
            unsafe { internals::volatile_write_zeroize(ptr, len) };
        }
        fence();
    }
}

impl MemZeroizer for VolatileWrite8Zeroizer {
    unsafe fn zeroize_mem(&self, ptr: *mut u8, len: usize) {
        precondition_memory_range!(ptr, len);
        // SAFETY: word writes only when `ptr` is checked to be 8 byte aligned
        unsafe { Self::wipe(ptr, len, (ptr as usize) % 8 == 0) }
    }

    unsafe fn zeroize_mem_minaligned(&self, ptr: *mut u8, len: usize, align: usize) {
        precondition_memory_range!(ptr, len);
        debug_checked_precondition!(align.is_power_of_two());
        debug_checked_precondition_eq!((ptr as usize) % align, 0);
        // SAFETY: `ptr` is `align` aligned by caller contract
        unsafe { Self::wipe(ptr, len, align >= 8 || (ptr as usize) % 8 == 0) }
    }
}

/// Keeps the wipe ordered before the unlock and unmap calls after it.
#[inline]
fn fence() {
    use core::sync::atomic::{compiler_fence, Ordering};

    compiler_fence(Ordering::SeqCst);
}

#[cfg(test)]
mod tests;
