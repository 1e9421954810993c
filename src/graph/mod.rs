//! Dependency graph construction.
//!
//! The builder resolves each composition root by recursive descent over an
//! immutable registry snapshot. Cycles are accepted only when they pass
//! through a deferred wrapper; the closing edge then refers back to the
//! node under construction.

pub mod builder;
pub mod cycle;
pub mod model;

pub use builder::{GraphBuilder, ResolveError};
pub use model::{
    BlockId, DependencyGraph, DependencyNode, EdgeId, GraphSnapshot, InjectionEdge, NodeId,
    NodeKind, RootAccess, RootNode, RootRequest, ScopeKey,
};
