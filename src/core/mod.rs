//! Core module re-exports.
//!
//! The shared vocabulary lives in `stitch-core`.
//! These are re-exported so the rest of the crate can use `crate::core::*`.

pub use stitch_core::core::*;
pub use stitch_core::*;
