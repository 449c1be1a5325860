// for `volatile_set_memory` and `unlikely`
#![cfg_attr(feature = "nightly_core_intrinsics", feature(core_intrinsics))]
#![forbid(rust_2018_compatibility, unsafe_op_in_unsafe_fn)]
#![deny(future_incompatible, rust_2018_idioms)]
#![warn(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
//! `secure-box` keeps a single secret value, such as a cryptographic key, a
//! password or a session token, in memory that is never written to swap and
//! that is zeroized the moment it is released.
//!
//! The value is moved into pages mapped for it alone, straight from the
//! operating system rather than from the global allocator, and those pages are
//! locked into physical memory (`mlock` on unix, `VirtualLock` on windows) for
//! as long as the [`SecureBox`] lives. The value is used in place through
//! references. Dropping the box, on any path including unwinding, drops the
//! value, zeroizes the pages, unlocks them and unmaps them.
//!
//! # Examples
//! ```
//! use secure_box::SecureBox;
//!
//! fn check_password(stored: &[u8; 16], attempt: &[u8]) -> bool {
//!     stored.as_slice() == attempt
//! }
//!
//! # fn main() -> Result<(), secure_box::SecureBoxError> {
//! let password = SecureBox::new(*b"correct horse!!!")?;
//! assert!(check_password(&password, b"correct horse!!!"));
//!
//! // taking the value back out ends its protection
//! let plain: [u8; 16] = SecureBox::into_inner(password);
//! assert_eq!(&plain, b"correct horse!!!");
//! # Ok(())
//! # }
//! ```
//!
//! # Limits
//! - Locked memory is a scarce resource: every box locks at least one page,
//!   and unprivileged processes may lock little memory in total (see
//!   [`lock`]). Construction fails with [`SecureBoxError::Lock`] when the
//!   limit is hit.
//! - Only memory owned by the box is protected. Copies of the value made
//!   before it was boxed, or after [`SecureBox::into_inner`], are not.
//! - Nothing here protects against core dumps, debuggers, hibernation or
//!   cold-boot attacks.
//!
//! # Logging
//! Failures to unlock or unmap a region while a box is released cannot be
//! returned to the caller. They are reported through the [`log`] facade
//! instead, at `warn` and `error` level; region life cycle events are logged
//! at `trace` level.
//!
//! # Cargo features
//! - `nightly_core_intrinsics` (requires nightly): use the volatile memset
//!   intrinsic for zeroization ([`zeroize::VolatileMemsetZeroizer`]).
//! - `nightly` (requires nightly): enable all nightly-only features.
//! - `dev`: enables all features required to run the test-suite, and should
//!   only be enabled for that purpose.

mod internals;
mod macros;
mod util;

pub mod boxed;
pub mod lock;
pub mod zeroize;

pub use boxed::{SecureBox, SecureBoxError};
