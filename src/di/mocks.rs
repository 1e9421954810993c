//! Mock implementations of service traits for testing

use super::traits::ConfigProvider;
use crate::config::MismatchPolicy;
use crate::graph::{DependencyGraph, GraphBuilder, RootRequest};
use crate::metadata::{
    ConstructorInfo, InMemoryMetadata, MemberInfo, MemberKind, ParameterInfo, TypeInfo, TypeKind,
};
use crate::registry::{Binding, BindingId, BindingRegistry, Producer};
use stitch_core::{CollectingSink, Injection, Lifetime, Tag, TypeRef};

/// Mock configuration provider for testing
///
/// # Example
///
/// ```
/// use stitch::di::mocks::MockConfigProvider;
/// use stitch::di::ConfigProvider;
///
/// let mut config = MockConfigProvider::default();
/// config.auto_bind = false;
///
/// assert_eq!(config.auto_bind(), false);
/// ```
#[derive(Clone)]
pub struct MockConfigProvider {
    pub default_lifetime: Lifetime,
    pub auto_bind: bool,
    pub thread_safe: bool,
    pub verbose: bool,
    pub field_prefix: String,
    pub lifetime_mismatch: MismatchPolicy,
    pub emit_graph: bool,
}

impl Default for MockConfigProvider {
    fn default() -> Self {
        Self {
            default_lifetime: Lifetime::Transient,
            auto_bind: true,
            thread_safe: true,
            verbose: true,
            field_prefix: "_".to_string(),
            lifetime_mismatch: MismatchPolicy::Warning,
            emit_graph: false,
        }
    }
}

impl ConfigProvider for MockConfigProvider {
    fn default_lifetime(&self) -> Lifetime {
        self.default_lifetime
    }

    fn auto_bind(&self) -> bool {
        self.auto_bind
    }

    fn thread_safe(&self) -> bool {
        self.thread_safe
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn field_prefix(&self) -> &str {
        &self.field_prefix
    }

    fn lifetime_mismatch(&self) -> MismatchPolicy {
        self.lifetime_mismatch
    }

    fn emit_graph(&self) -> bool {
        self.emit_graph
    }
}

/// Fluent builder for [`TypeInfo`] fixtures
///
/// Type strings are parsed with the builder's generic parameters as markers.
/// Panics on malformed type strings, which is what a test wants.
///
/// # Example
///
/// ```
/// use stitch::di::mocks::TypeBuilder;
///
/// let info = TypeBuilder::class("Service")
///     .implements("IService")
///     .ctor(&[("dependency", "IDependency")])
///     .property("Logger", "ILogger", Some(1))
///     .build();
///
/// assert_eq!(info.constructors[0].parameters.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    info: TypeInfo,
}

impl TypeBuilder {
    pub fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            info: TypeInfo::new(name, kind),
        }
    }

    pub fn class(name: &str) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn structure(name: &str) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn interface(name: &str) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn abstract_class(name: &str) -> Self {
        Self::new(name, TypeKind::Abstract)
    }

    pub fn generic_params(mut self, params: &[&str]) -> Self {
        self.info.generic_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn base(mut self, base: &str) -> Self {
        self.info.base = Some(self.ty(base));
        self
    }

    pub fn implements(mut self, contract: &str) -> Self {
        let ty = self.ty(contract);
        self.info.implements.push(ty);
        self
    }

    /// Public constructor
    pub fn ctor(self, params: &[(&str, &str)]) -> Self {
        self.constructor(params, true, false)
    }

    /// Constructor explicitly selected for injection
    pub fn marked_ctor(self, params: &[(&str, &str)]) -> Self {
        self.constructor(params, true, true)
    }

    pub fn private_ctor(self, params: &[(&str, &str)]) -> Self {
        self.constructor(params, false, false)
    }

    fn constructor(mut self, params: &[(&str, &str)], public: bool, marked: bool) -> Self {
        let parameters = self.params(params);
        self.info.constructors.push(ConstructorInfo {
            parameters,
            public,
            marked,
        });
        self
    }

    pub fn property(self, name: &str, ty: &str, ordinal: Option<i32>) -> Self {
        self.value_member(name, MemberKind::Property, ty, ordinal)
    }

    pub fn field(self, name: &str, ty: &str, ordinal: Option<i32>) -> Self {
        self.value_member(name, MemberKind::Field, ty, ordinal)
    }

    fn value_member(mut self, name: &str, kind: MemberKind, ty: &str, ordinal: Option<i32>) -> Self {
        let ty = self.ty(ty);
        self.info.members.push(MemberInfo {
            name: name.to_string(),
            kind,
            ty: Some(ty),
            parameters: Vec::new(),
            ordinal,
        });
        self
    }

    pub fn method(mut self, name: &str, params: &[(&str, &str)], ordinal: Option<i32>) -> Self {
        let parameters = self.params(params);
        self.info.members.push(MemberInfo {
            name: name.to_string(),
            kind: MemberKind::Method,
            ty: None,
            parameters,
            ordinal,
        });
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }

    /// Metadata containing just this type
    pub fn into_metadata(self) -> InMemoryMetadata {
        let mut metadata = InMemoryMetadata::new();
        metadata.insert_type(self.info);
        metadata
    }

    fn params(&self, params: &[(&str, &str)]) -> Vec<ParameterInfo> {
        params
            .iter()
            .map(|(name, ty)| ParameterInfo {
                name: name.to_string(),
                ty: self.ty(ty),
            })
            .collect()
    }

    fn ty(&self, text: &str) -> TypeRef {
        let generic_params = &self.info.generic_params;
        TypeRef::parse_with(text, &|name| generic_params.iter().any(|p| p == name))
            .unwrap_or_else(|e| panic!("invalid fixture type '{}': {}", text, e))
    }
}

/// Metadata built from several fixtures
pub fn metadata_of(types: Vec<TypeBuilder>) -> InMemoryMetadata {
    let mut metadata = InMemoryMetadata::new();
    for builder in types {
        metadata.insert_type(builder.build());
    }
    metadata
}

/// Parse a fixture type, treating `TT`-prefixed names as markers
pub fn ty(text: &str) -> TypeRef {
    TypeRef::parse_with(text, &|name| name.starts_with("TT"))
        .unwrap_or_else(|e| panic!("invalid fixture type '{}': {}", text, e))
}

/// Untagged, public root
pub fn root(name: &str, contract: &str) -> RootRequest {
    RootRequest::new(name, Injection::untagged(ty(contract)))
}

/// Registry, metadata and config for driving a pass in tests
///
/// # Example
///
/// ```
/// use stitch::di::mocks::{root, Scenario, TypeBuilder};
/// use stitch::core::Lifetime;
///
/// let mut scenario = Scenario::new(vec![TypeBuilder::class("Service")]);
/// scenario.bind("IService", "Service", Lifetime::Singleton);
///
/// let graph = scenario.build(&[root("Root", "IService")]);
/// assert!(graph.roots()[0].is_resolved());
/// ```
pub struct Scenario {
    pub registry: BindingRegistry,
    pub metadata: InMemoryMetadata,
    pub config: MockConfigProvider,
    pub sink: CollectingSink,
}

impl Scenario {
    pub fn new(types: Vec<TypeBuilder>) -> Self {
        Self {
            registry: BindingRegistry::new(),
            metadata: metadata_of(types),
            config: MockConfigProvider::default(),
            sink: CollectingSink::new(),
        }
    }

    pub fn bind(&mut self, contract: &str, implementation: &str, lifetime: Lifetime) -> BindingId {
        self.bind_tagged(contract, None, implementation, lifetime)
    }

    pub fn bind_tagged(
        &mut self,
        contract: &str,
        tag: Option<Tag>,
        implementation: &str,
        lifetime: Lifetime,
    ) -> BindingId {
        let binding = Binding::new(
            vec![ty(contract)],
            lifetime,
            Producer::implementation(ty(implementation)),
        )
        .with_tag(tag);
        self.register(binding)
    }

    pub fn register(&mut self, binding: Binding) -> BindingId {
        self.registry.register(binding, &mut self.sink)
    }

    /// Resolve `roots` into a graph, reporting into `self.sink`
    pub fn build(&mut self, roots: &[RootRequest]) -> DependencyGraph {
        let builder = GraphBuilder::new(
            self.registry.snapshot(),
            &self.metadata,
            &self.config,
            roots,
        );
        builder.build(roots, &mut self.sink)
    }
}
