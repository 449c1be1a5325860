//! Platform bindings and raw memory helpers backing the public modules.

pub mod mem;
pub mod zeroize;
