//! Integration tests module
//!
//! Runs the `stitch` binary against setup documents written to temp dirs.

pub mod check;
pub mod common;
pub mod generate;
pub mod graph;
