//! Binding registry: declared bindings keyed by (contract, tag)

pub mod binding;
pub mod registry;

pub use binding::{Binding, BindingId, Factory, FactoryInjection, Producer};
pub use registry::{BindingRegistry, Candidate, Lookup, RegistrySnapshot};
