//! Trait definitions for dependency injection

use crate::config::MismatchPolicy;
use crate::metadata::{InjectionMetadata, SiteRef, TypeInfo};
use stitch_core::Lifetime;

/// Trait for configuration access
///
/// Provides read-only access to generator configuration.
/// Implementations should be thread-safe (Send + Sync).
pub trait ConfigProvider: Send + Sync {
    /// Lifetime used for auto-bound concrete types
    fn default_lifetime(&self) -> Lifetime;

    /// Whether unbound concrete types resolve to themselves
    fn auto_bind(&self) -> bool;

    /// Whether persistent storage must be guarded against concurrent first access
    fn thread_safe(&self) -> bool;

    /// Whether informational diagnostics are reported
    fn verbose(&self) -> bool;

    /// Prefix for persistent storage field names
    fn field_prefix(&self) -> &str;

    /// How lifetime mismatches are reported
    fn lifetime_mismatch(&self) -> MismatchPolicy;

    /// Whether `generate` output includes the graph snapshot
    fn emit_graph(&self) -> bool;
}

/// Trait for the metadata model
///
/// Answers questions about type definitions and per-site attribute
/// overrides. The resolver treats this as a capability query and never
/// looks at attributes directly.
pub trait MetadataProvider: Send + Sync {
    /// Definition of a type by name (without generic arguments)
    fn type_info(&self, name: &str) -> Option<&TypeInfo>;

    /// Tag/ordinal/explicit-type overrides for one injection site
    fn injection_metadata(&self, site: &SiteRef<'_>) -> InjectionMetadata;
}
