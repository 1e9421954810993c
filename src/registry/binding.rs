use serde::Serialize;
use stitch_core::{Injection, Lifetime, SourceLocation, Tag, TypeRef};

/// Registration ordinal of a binding; later bindings have larger ids
pub type BindingId = usize;

/// A declared mapping from one or more contracts to a producer
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub id: BindingId,
    pub contracts: Vec<TypeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    pub lifetime: Lifetime,
    pub producer: Producer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Binding {
    /// A binding with a placeholder id; the registry assigns the real one
    pub fn new(contracts: Vec<TypeRef>, lifetime: Lifetime, producer: Producer) -> Self {
        Self {
            id: 0,
            contracts,
            tag: None,
            lifetime,
            producer,
            location: None,
        }
    }

    pub fn with_tag(mut self, tag: Option<Tag>) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }
}

/// How a binding produces its instance
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Producer {
    /// Call a constructor of the implementation type
    Implementation { ty: TypeRef },
    /// Evaluate a factory expression with its declared injections
    Factory(Factory),
    /// External argument passed to the composition
    Arg { name: String },
    /// Delegate to another composition root by name
    RootDelegate { root: String },
}

impl Producer {
    pub fn implementation(ty: TypeRef) -> Self {
        Producer::Implementation { ty }
    }
}

/// A factory expression plus the values it asks the context for
///
/// The expression is opaque text owned by the front end. Each injection is
/// resolved like a constructor parameter and handed to the expression
/// under its name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Factory {
    pub expression: String,
    pub injections: Vec<FactoryInjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactoryInjection {
    pub name: String,
    pub injection: Injection,
}
