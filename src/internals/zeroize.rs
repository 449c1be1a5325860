//! Raw functions for wiping memory that will not be elided by the compiler.
//!
//! Used by the [`crate::zeroize`] zeroizers, which in turn are used when a
//! [`crate::SecureBox`] releases its region.

mod system;
pub use system::*;

mod volatile_write;
pub use volatile_write::*;

/// Volatile write byte to memory.
///
/// This uses the [`core::intrinsics::volatile_set_memory`] intrinsic and can
/// only be used on nightly, with the `nightly_core_intrinsics` feature enabled.
///
/// # Safety
/// The caller *must* ensure that `ptr` is valid for writes of `len` bytes, see
/// the [`std::ptr`] documentation. In particular this function is not atomic.
#[cfg(feature = "nightly_core_intrinsics")]
pub unsafe fn volatile_memset(ptr: *mut u8, val: u8, len: usize) {
    crate::macros::precondition_memory_range!(ptr, len);
    // SAFETY: the caller must uphold the safety contract
    unsafe {
        core::intrinsics::volatile_set_memory(ptr, val, len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A page worth of secret looking bytes, 8 byte aligned like a region.
    #[repr(align(8))]
    struct SecretPage([u8; 4096]);

    impl SecretPage {
        fn new() -> Self {
            let mut bytes = [0_u8; 4096];
            for (i, b) in bytes.iter_mut().enumerate() {
                // never zero, so a missed byte is always visible
                *b = (i % 251) as u8 | 0x01;
            }
            Self(bytes)
        }
    }

    fn assert_wipes_page<Z: FnOnce(*mut u8, usize)>(zeroize: Z) {
        let mut page = SecretPage::new();
        zeroize(page.0.as_mut_ptr(), page.0.len());
        assert!(page.0.iter().all(|&b| b == 0));
    }

    fn assert_wipes_unaligned_tail<Z: FnOnce(*mut u8, usize)>(zeroize: Z) {
        let mut page = SecretPage::new();
        let first = page.0[0];
        let last = page.0[4095];
        // skip the first and last byte so the range is odd sized and 1 byte aligned
        let ptr = unsafe { page.0.as_mut_ptr().add(1) };
        zeroize(ptr, 4094);
        assert_eq!(page.0[0], first);
        assert_eq!(page.0[4095], last);
        assert!(page.0[1..4095].iter().all(|&b| b == 0));
    }

    #[cfg(feature = "nightly_core_intrinsics")]
    #[test]
    fn volatile_memset_wipes_page() {
        assert_wipes_page(|ptr, len| unsafe { volatile_memset(ptr, 0, len) })
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "macos",
        target_os = "ios",
        target_env = "gnu",
        target_env = "musl"
    ))]
    #[test]
    #[cfg_attr(miri, ignore)] // ffi
    fn explicit_bzero_wipes_page() {
        assert_wipes_page(|ptr, len| unsafe { libc_explicit_bzero(ptr, len) })
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "macos",
        target_os = "ios",
        target_env = "gnu",
        target_env = "musl"
    ))]
    #[test]
    #[cfg_attr(miri, ignore)] // ffi
    fn explicit_bzero_wipes_unaligned_tail() {
        assert_wipes_unaligned_tail(|ptr, len| unsafe { libc_explicit_bzero(ptr, len) })
    }

    #[test]
    fn volatile_write_wipes_page() {
        assert_wipes_page(|ptr, len| unsafe { volatile_write_zeroize(ptr, len) })
    }

    #[test]
    fn volatile_write_wipes_unaligned_tail() {
        assert_wipes_unaligned_tail(|ptr, len| unsafe { volatile_write_zeroize(ptr, len) })
    }

    #[test]
    fn volatile_write8_wipes_page() {
        assert_wipes_page(|ptr, len| unsafe { volatile_write8_zeroize(ptr, len) })
    }

    #[test]
    fn volatile_write8_wipes_odd_length() {
        let mut page = SecretPage::new();
        let untouched = page.0[4095];
        unsafe { volatile_write8_zeroize(page.0.as_mut_ptr(), 4095) };
        assert!(page.0[..4095].iter().all(|&b| b == 0));
        assert_eq!(page.0[4095], untouched);
    }
}
