//! Type unification for open-generic bindings.
//!
//! Matching is structural and invariant: a pattern such as `IBox<TT>`
//! unifies with `IBox<int>` by binding `TT = int`, and the binding is then
//! checked against the marker's declared constraints.

pub mod constraints;
pub mod shape;
pub mod unifier;

pub use constraints::{Constraint, MarkerSet};
pub use shape::{CollectionKind, ContractShape, DeferredKind};
pub use unifier::{assignable, unify, unify_fresh};
