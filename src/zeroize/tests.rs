use super::*;

/// Two pages of a recognisable key pattern, page aligned like a region.
#[repr(align(4096))]
struct KeyPages([u8; 8192]);

impl KeyPages {
    fn new() -> Self {
        Self([0xA5; 8192])
    }

    fn is_zero(&self, range: core::ops::Range<usize>) -> bool {
        self.0[range].iter().all(|&b| b == 0)
    }
}

fn test_whole_region<Z: MemZeroizer>(z: Z) {
    let mut pages = KeyPages::new();
    unsafe { z.zeroize_mem(pages.0.as_mut_ptr(), pages.0.len()) };
    assert!(pages.is_zero(0..8192));
}

fn test_whole_region_minaligned<Z: MemZeroizer>(z: Z) {
    let mut pages = KeyPages::new();
    unsafe { z.zeroize_mem_minaligned(pages.0.as_mut_ptr(), pages.0.len(), 4096) };
    assert!(pages.is_zero(0..8192));
}

fn test_value_within_region<Z: MemZeroizer>(z: Z) {
    // a 13 byte value placed 3 bytes into the region
    let mut pages = KeyPages::new();
    let ptr = unsafe { pages.0.as_mut_ptr().add(3) };
    unsafe { z.zeroize_mem(ptr, 13) };
    assert!(pages.0[..3].iter().all(|&b| b == 0xA5));
    assert!(pages.is_zero(3..16));
    assert!(pages.0[16..].iter().all(|&b| b == 0xA5));
}

#[test]
fn default_zeroizer() {
    test_whole_region(DefaultMemZeroizer::default());
    test_whole_region_minaligned(DefaultMemZeroizer::default());
    test_value_within_region(DefaultMemZeroizer::default());
}

#[cfg(feature = "nightly_core_intrinsics")]
#[test]
fn volatile_memset_zeroizer() {
    test_whole_region(VolatileMemsetZeroizer);
    test_value_within_region(VolatileMemsetZeroizer);
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
fn libc_zeroizer() {
    test_whole_region(LibcZeroizer);
    test_whole_region_minaligned(LibcZeroizer);
    test_value_within_region(LibcZeroizer);
}

#[test]
fn volatile_write_zeroizer() {
    test_whole_region(VolatileWriteZeroizer);
    test_value_within_region(VolatileWriteZeroizer);
}

#[test]
fn zeroizer_behind_reference() {
    let zeroizer = VolatileWrite8Zeroizer;
    test_whole_region(&zeroizer);
    test_whole_region_minaligned(&zeroizer);
    test_value_within_region(&zeroizer);
}

#[test]
fn volatile_write8_zeroizer() {
    test_whole_region(VolatileWrite8Zeroizer);
    test_whole_region_minaligned(VolatileWrite8Zeroizer);
    test_value_within_region(VolatileWrite8Zeroizer);
}

#[test]
fn volatile_write8_zeroizer_low_align_hint() {
    let mut pages = KeyPages::new();
    let ptr = unsafe { pages.0.as_mut_ptr().add(1) };
    unsafe { VolatileWrite8Zeroizer.zeroize_mem_minaligned(ptr, 100, 1) };
    assert_eq!(pages.0[0], 0xA5);
    assert!(pages.is_zero(1..101));
    assert_eq!(pages.0[101], 0xA5);
}
