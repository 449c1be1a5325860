//! Bindings to the non-elidable memset variants of the system libc.

use crate::macros::precondition_memory_range;

/// Overwrite `len` bytes at `ptr` with zeros using the libc primitive that is
/// documented to survive dead store elimination.
///
/// Which primitive that is depends on the platform:
/// - `explicit_bzero` on glibc, musl, FreeBSD, DragonFly and OpenBSD, and on
///   windows-gnu (mingw exports it without a `libc` crate binding);
/// - `explicit_memset` on NetBSD;
/// - `memset_s` on macOS and iOS.
///
/// # Safety
/// The caller *must* ensure that `ptr` is valid for writes of `len` bytes, see
/// the [`std::ptr`] documentation. In particular this function is not atomic.
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
pub unsafe fn libc_explicit_bzero(ptr: *mut u8, len: usize) {
    precondition_memory_range!(ptr, len);
    let dest = ptr.cast::<libc::c_void>();

    cfg_if::cfg_if! {
        if #[cfg(target_os = "netbsd")] {
            // SAFETY: the caller must uphold the safety contract
            unsafe { libc::explicit_memset(dest, 0, len) };
        } else if #[cfg(any(target_os = "macos", target_os = "ios"))] {
            // the fill value is an `int` that is converted to `unsigned char`
            // SAFETY: the caller must uphold the safety contract
            unsafe { libc::memset_s(dest, len, 0, len) };
        } else if #[cfg(windows)] {
            extern "C" {
                fn explicit_bzero(ptr: *mut libc::c_void, len: libc::size_t);
            }
            // SAFETY: the caller must uphold the safety contract
            unsafe { explicit_bzero(dest, len) };
        } else {
            // SAFETY: the caller must uphold the safety contract
            unsafe { libc::explicit_bzero(dest, len) };
        }
    }
}
