use criterion::{black_box, criterion_group, criterion_main, Criterion};
use secure_box::zeroize::{MemZeroizer, VolatileWrite8Zeroizer, VolatileWriteZeroizer};
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
use secure_box::zeroize::LibcZeroizer;
use secure_box::SecureBox;

fn box_round_trip(c: &mut Criterion) {
    let mut cgroup = c.benchmark_group("SecureBox life cycle");
    cgroup.bench_function("new + drop, 32 byte key", |b| {
        b.iter(|| {
            let key = SecureBox::new(black_box([0x42_u8; 32])).expect("box creation failed");
            black_box(&*key);
        })
    });
    cgroup.bench_function("new + into_inner, 32 byte key", |b| {
        b.iter(|| {
            let key = SecureBox::new(black_box([0x42_u8; 32])).expect("box creation failed");
            black_box(SecureBox::into_inner(key))
        })
    });
    cgroup.bench_function("new + drop, 8 KiB secret", |b| {
        b.iter(|| {
            let secret =
                SecureBox::new(black_box([0x42_u8; 8192])).expect("box creation failed");
            black_box(&secret[..]);
        })
    });
}

#[repr(align(4096))]
struct Page([u8; 4096]);

fn zeroize_page<Z: MemZeroizer>(z: &Z, page: &mut Page) {
    unsafe { z.zeroize_mem_minaligned(page.0.as_mut_ptr(), page.0.len(), 4096) }
}

fn region_zeroizers(c: &mut Criterion) {
    let mut page = Page([0xAF; 4096]);
    let mut cgroup = c.benchmark_group("MemZeroizer one page");
    cgroup.bench_function("VolatileWriteZeroizer", |b| {
        b.iter(|| zeroize_page(&VolatileWriteZeroizer, &mut page))
    });
    cgroup.bench_function("VolatileWrite8Zeroizer", |b| {
        b.iter(|| zeroize_page(&VolatileWrite8Zeroizer, &mut page))
    });
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
    {
        cgroup.bench_function("LibcZeroizer", |b| {
            b.iter(|| zeroize_page(&LibcZeroizer, &mut page))
        });
    }
}

criterion_group!(bench_secure_box, box_round_trip, region_zeroizers);
criterion_main!(bench_secure_box);
