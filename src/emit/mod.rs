//! Statement emission.
//!
//! Walks each resolved root of a planned graph and produces the ordered
//! statements a renderer turns into source text.

pub mod code;
pub mod emitter;

pub use code::{
    walk, ArgDecl, Call, CallKind, CompositionCode, Expr, Param, RootCode, Statement, Thunk, Var,
};
pub use emitter::{fingerprint, Emitter};
