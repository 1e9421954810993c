//! Setup documents.
//!
//! A setup document is the YAML form of everything a front end hands the
//! generator: marker declarations, the metadata model, bindings in
//! declaration order and the requested composition roots.

pub mod compile;
pub mod document;

pub use compile::CompiledSetup;
pub use document::{
    BindingDecl, ConstraintDecl, ConstructorDecl, FactoryDecl, FactoryInjectionDecl, MarkerDecl,
    MemberDecl, ParameterDecl, RootDecl, Setup, TagDecl, TypeDecl,
};
