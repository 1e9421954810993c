//! Metadata model describing the types a composition can instantiate.
//!
//! The resolver never inspects host-language syntax. It asks a
//! [`MetadataProvider`](crate::di::MetadataProvider) for constructors,
//! injectable members and per-site overrides (tag, ordinal, explicit type).

pub mod in_memory;
pub mod model;

pub use in_memory::InMemoryMetadata;
pub use model::{
    ConstructorInfo, InjectionMetadata, MemberInfo, MemberKind, ParameterInfo, SiteRef, TypeInfo,
    TypeKind,
};
