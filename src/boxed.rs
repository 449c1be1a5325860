//! A box for a single secret value in locked memory.
//!
//! [`SecureBox<T>`] moves its value into pages of its own, mapped directly
//! from the operating system and locked against paging, and hands out only
//! references into those pages. When the box is dropped, or the value is taken
//! back out with [`SecureBox::into_inner`], the pages are zeroized, unlocked
//! and unmapped, in that order.
//!
//! Locking and wiping are pluggable through [`MemLocker`] and [`MemZeroizer`];
//! [`SecureBox::new`] uses the system locker and [`DefaultMemZeroizer`].
//!
//! # Examples
//! ```
//! use secure_box::SecureBox;
//!
//! # fn main() -> Result<(), secure_box::SecureBoxError> {
//! let mut key = SecureBox::new([0_u8; 32])?;
//! // fill the key in place, it never leaves the locked pages
//! key.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);
//! assert_eq!(key[31], 31);
//! // `key` is zeroized, unlocked and unmapped here
//! # Ok(())
//! # }
//! ```

use crate::internals::mem::{self, Region};
use crate::lock::{MemLocker, SysMemLocker};
use crate::util;
use crate::zeroize::{DefaultMemZeroizer, MemZeroizer};
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};
use std::io;

/// Could not create a [`SecureBox`].
///
/// In both cases the value passed to the constructor has been dropped, and any
/// memory it was written to has been zeroized and released.
#[derive(Debug, thiserror::Error)]
pub enum SecureBoxError {
    /// No region could be mapped for the value.
    #[error("could not allocate a secure memory region: {0}")]
    Alloc(io::Error),
    /// The region could not be locked into physical memory.
    #[error("could not lock the secure memory region to physical memory: {0}")]
    Lock(io::Error),
}

/// A single value of type `T` kept in locked memory that is zeroized on
/// release.
///
/// The value lives in a dedicated, page aligned region of whole pages. The
/// region is locked with `L` for the entire life of the box, so it is never
/// written to swap (hibernation aside). Access goes through [`Deref`] and
/// [`DerefMut`], which borrow the value in place. The only way to move the
/// value out is [`SecureBox::into_inner`], which consumes the box.
///
/// Dropping the box drops the value in place, then zeroizes the whole region
/// with `Z`, unlocks it and unmaps it. This also happens during unwinding. Failing to
/// unlock or unmap is logged and otherwise ignored, so dropping never fails.
///
/// Every box uses at least one page of locked memory; see [`crate::lock`] for
/// the limits on locked memory.
///
/// Like [`Box`], a `SecureBox` adds no synchronisation: it is [`Send`] and
/// [`Sync`] exactly when `T` (and the locker and zeroizer) are.
pub struct SecureBox<T, L: MemLocker = SysMemLocker, Z: MemZeroizer = DefaultMemZeroizer> {
    /// Pointer to the value, inside `pages`.
    // SAFETY INVARIANT: points to a valid, initialised `T` within `pages`
    value: NonNull<T>,
    /// The locked region holding the value.
    pages: LockedRegion<L, Z>,
    // we own an instance of type `T`
    _phantom_value: PhantomData<T>,
}

// SAFETY: the box uniquely owns both the value and its region, like `Box<T>`
unsafe impl<T: Send, L: MemLocker + Send, Z: MemZeroizer + Send> Send for SecureBox<T, L, Z> {}
// SAFETY: shared access only gives out `&T`, like `Box<T>`
unsafe impl<T: Sync, L: MemLocker + Sync, Z: MemZeroizer + Sync> Sync for SecureBox<T, L, Z> {}

impl<T> SecureBox<T> {
    /// Move `value` into a new locked region.
    ///
    /// # Errors
    /// Returns [`SecureBoxError::Alloc`] if no region could be mapped, and
    /// [`SecureBoxError::Lock`] if the region could not be locked. The latter
    /// is usually caused by exceeding the lock limit of the process. On error
    /// `value` is dropped, after which its region is zeroized and unmapped.
    pub fn new(value: T) -> Result<Self, SecureBoxError> {
        Self::new_with_locker(value, SysMemLocker)
    }
}

impl<T, L: MemLocker> SecureBox<T, L> {
    /// Move `value` into a new region locked with `locker`.
    ///
    /// # Errors
    /// See [`SecureBox::new`].
    pub fn new_with_locker(value: T, locker: L) -> Result<Self, SecureBoxError> {
        Self::new_with(value, locker, DefaultMemZeroizer::default())
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> SecureBox<T, L, Z> {
    /// Move `value` into a new region locked with `locker`, which `zeroizer`
    /// wipes when the box is released.
    ///
    /// The region is wiped with `zeroizer` on the failure paths as well.
    ///
    /// # Errors
    /// See [`SecureBox::new`].
    pub fn new_with(value: T, locker: L, zeroizer: Z) -> Result<Self, SecureBoxError> {
        let layout = Layout::new::<T>();
        let len = util::region_len(layout.size(), layout.align(), mem::page_size())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "value too large for a secure region",
                )
            })
            .map_err(SecureBoxError::Alloc)?;
        let region = Region::map(len).map_err(SecureBoxError::Alloc)?;
        let mut pages = LockedRegion {
            region,
            locker,
            zeroizer,
            locked: false,
        };

        // SAFETY: `layout.align()` is a power of two. The region is page aligned and
        // `region_len` reserved the slack needed for larger alignments, so the aligned
        // pointer and the `layout.size()` bytes after it lie within the region.
        let value_ptr = unsafe { util::align_ptr_mut(pages.region.as_ptr_mut(), layout.align()) };
        // SAFETY: the pointer lies within the region, so it is non-null
        let value_ptr = unsafe { NonNull::new_unchecked(value_ptr.cast::<T>()) };
        // SAFETY: `value_ptr` is valid for writes and aligned for `T`
        unsafe { value_ptr.as_ptr().write(value) };

        // SAFETY: the region is a live, page aligned mapping of whole pages
        let locked = unsafe { pages.locker.lock(pages.region.ptr_nonnull(), len) };
        if let Err(err) = locked {
            // SAFETY: the value was written above and is not used afterwards
            unsafe { value_ptr.as_ptr().drop_in_place() };
            // dropping `pages` zeroizes and unmaps the region
            return Err(SecureBoxError::Lock(err));
        }
        pages.locked = true;
        log::trace!("locked secure region of {len} bytes");

        Ok(Self {
            value: value_ptr,
            pages,
            _phantom_value: PhantomData,
        })
    }

    /// Move the value out of the box, ending its protection.
    ///
    /// The region is zeroized, unlocked and unmapped before this returns. The
    /// returned value is an ordinary, unlocked value again.
    ///
    /// This is an associated function rather than a method so it cannot
    /// shadow a method of `T`; call it as `SecureBox::into_inner(boxed)`.
    #[must_use]
    pub fn into_inner(boxed: Self) -> T {
        // keep our `drop` implementation from dropping the value a second time
        let boxed = ManuallyDrop::new(boxed);
        // SAFETY: `boxed.value` points to a valid `T`, which is never used again
        let value = unsafe { boxed.value.as_ptr().read() };
        // SAFETY: `boxed` is never dropped, so `pages` is moved out exactly once
        let pages = unsafe { ptr::read(&boxed.pages) };
        drop(pages);
        value
    }

    /// Raw pointer to the value inside the locked region.
    ///
    /// The pointer is only valid while `boxed` is alive and must not be
    /// retained past that. Reading the value out through it defeats the
    /// purpose of the box; use it to hand the value's address to APIs that
    /// need one.
    #[must_use]
    pub fn as_ptr(boxed: &Self) -> *mut T {
        boxed.value.as_ptr()
    }

    /// Number of bytes of locked memory held by the box.
    ///
    /// Always a non-zero multiple of [`crate::lock::page_size`].
    #[must_use]
    pub fn region_len(boxed: &Self) -> usize {
        boxed.pages.region.len()
    }

    /// The locker holding the lock on the box's region.
    #[must_use]
    pub fn locker(boxed: &Self) -> &L {
        &boxed.pages.locker
    }

    /// The zeroizer that will wipe the box's region.
    #[must_use]
    pub fn zeroizer(boxed: &Self) -> &Z {
        &boxed.pages.zeroizer
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> Deref for SecureBox<T, L, Z> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `self.value` always points to a valid instance of `T`, owned by
        // `self` and never exposed as a reference outliving the borrow of `self`
        unsafe { self.value.as_ref() }
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> DerefMut for SecureBox<T, L, Z> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: `self.value` always points to a valid instance of `T`, and we have
        // unique access to `self`
        unsafe { self.value.as_mut() }
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> AsRef<T> for SecureBox<T, L, Z> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> AsMut<T> for SecureBox<T, L, Z> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> fmt::Debug for SecureBox<T, L, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBox")
            .field("value", &"<redacted>")
            .field("region_len", &self.pages.region.len())
            .finish()
    }
}

impl<T, L: MemLocker, Z: MemZeroizer> Drop for SecureBox<T, L, Z> {
    fn drop(&mut self) {
        // SAFETY: `self.value` points to a valid `T`; `into_inner` never gets here
        unsafe { self.value.as_ptr().drop_in_place() };
        // `self.pages` is dropped next, even if the value's destructor panicked,
        // and wipes, unlocks and unmaps the region
    }
}

/// A mapped region together with the locker and zeroizer responsible for it.
///
/// Dropping it zeroizes the whole region, unlocks it if `locked`, and finally
/// unmaps it when `region` drops.
struct LockedRegion<L: MemLocker, Z: MemZeroizer> {
    region: Region,
    locker: L,
    zeroizer: Z,
    /// Whether `locker.lock` succeeded for `region`.
    locked: bool,
}

impl<L: MemLocker, Z: MemZeroizer> Drop for LockedRegion<L, Z> {
    fn drop(&mut self) {
        let ptr = self.region.as_ptr_mut();
        let len = self.region.len();
        // SAFETY: the region is a live mapping of `len` bytes, page aligned, and
        // nothing refers into it anymore
        unsafe { self.zeroizer.zeroize_mem_minaligned(ptr, len, mem::page_size()) };

        if self.locked {
            // SAFETY: these are the arguments of the successful `lock` call
            let unlocked = unsafe { self.locker.unlock(self.region.ptr_nonnull(), len) };
            match unlocked {
                Ok(()) => log::trace!("released secure region of {len} bytes"),
                Err(err) => log::warn!("could not unlock secure region of {len} bytes: {err}"),
            }
        }
        // `self.region` unmaps itself
    }
}
