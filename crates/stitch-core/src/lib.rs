//! Core vocabulary shared by the Stitch generator and its front ends.
//!
//! Everything here is plain data: type descriptors, tags, lifetimes,
//! injections and diagnostics. The resolver itself lives in the `stitch`
//! crate.

pub mod core;
pub mod diagnostics;

pub use crate::core::{Injection, Lifetime, StitchError, StitchResult, Substitution, Tag, TypeRef};
pub use crate::diagnostics::{
    CollectingSink, Diagnostic, DiagnosticId, DiagnosticSink, Severity, SourceLocation,
};
