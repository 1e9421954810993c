//! Stitch: compile-time dependency injection resolver and code generator
//!
//! This crate provides the generator library, re-exporting the shared
//! vocabulary from `stitch-core` and organizing the resolver stages.

pub use stitch_core::{Diagnostic, DiagnosticId, DiagnosticSink, Severity, StitchError, StitchResult};

/// Core module re-exported from stitch-core.
pub mod core;

/// Generator configuration.
pub mod config;

/// Dependency injection infrastructure for the generator itself.
pub mod di;

/// Metadata model and providers.
pub mod metadata;

/// Marker unification, constraints and contract shapes.
pub mod unify;

/// Binding registry.
pub mod registry;

/// Injection site extraction.
pub mod injection;

/// Dependency graph construction.
pub mod graph;

/// Lifetime and storage planning.
pub mod planner;

/// Statement emission.
pub mod emit;

/// Generator pass driver.
pub mod generator;

/// Setup documents.
pub mod setup;

pub use generator::{GenerationOutput, Generator};
