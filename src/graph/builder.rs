use super::cycle::{Repeat, ResolutionStack};
use super::model::{
    BlockId, DependencyGraph, DependencyNode, InjectionEdge, NodeId, NodeKind, RootNode,
    RootRequest, ScopeKey,
};
use crate::di::{ConfigProvider, MetadataProvider};
use crate::injection::{ExtractError, InjectionSite, SiteExtractor, SiteKind};
use crate::registry::{BindingId, Candidate, Factory, Lookup, Producer, RegistrySnapshot};
use crate::unify::{CollectionKind, ContractShape, DeferredKind};
use std::collections::{HashMap, HashSet};
use stitch_core::{
    Diagnostic, DiagnosticId, DiagnosticSink, Injection, Lifetime, SourceLocation, TypeRef,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a root could not be resolved
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Unable to resolve {injection} for {site}")]
    UnableToResolve {
        injection: Injection,
        site: String,
        chain: Vec<Injection>,
    },

    #[error("Circular dependency: {}", render(.cycle))]
    CircularDependency {
        cycle: Vec<Injection>,
        chain: Vec<Injection>,
    },

    #[error("No suitable constructor for '{ty}': {reason}")]
    NoSuitableConstructor {
        ty: TypeRef,
        reason: String,
        chain: Vec<Injection>,
        location: Option<SourceLocation>,
    },

    #[error("{injection} matches binding #{binding} but {reason}")]
    ConstraintViolation {
        injection: Injection,
        binding: BindingId,
        reason: String,
        chain: Vec<Injection>,
        location: Option<SourceLocation>,
    },
}

fn render(chain: &[Injection]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl ResolveError {
    pub fn id(&self) -> DiagnosticId {
        match self {
            ResolveError::UnableToResolve { .. } => DiagnosticId::UnableToResolve,
            ResolveError::CircularDependency { .. } => DiagnosticId::CircularDependency,
            ResolveError::NoSuitableConstructor { .. } => DiagnosticId::NoSuitableConstructor,
            ResolveError::ConstraintViolation { .. } => DiagnosticId::ConstraintViolation,
        }
    }

    pub fn chain(&self) -> &[Injection] {
        match self {
            ResolveError::UnableToResolve { chain, .. }
            | ResolveError::CircularDependency { chain, .. }
            | ResolveError::NoSuitableConstructor { chain, .. }
            | ResolveError::ConstraintViolation { chain, .. } => chain,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let location = match &self {
            ResolveError::NoSuitableConstructor { location, .. }
            | ResolveError::ConstraintViolation { location, .. } => location.clone(),
            _ => None,
        };
        Diagnostic::error(self.id(), self.to_string())
            .with_chain(self.chain().to_vec())
            .with_location(location)
    }
}

/// Identity of a shareable instance site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    binding: Option<BindingId>,
    ty: TypeRef,
    scope: ScopeKey,
}

/// Where resolution currently happens
#[derive(Debug, Clone)]
struct Context {
    block: BlockId,
    resolve: usize,
    /// Parameters of enclosing parameterized factories, innermost last
    func_args: Vec<(NodeId, Vec<TypeRef>)>,
}

#[derive(Debug, Clone)]
struct Request {
    injection: Injection,
    site: SiteKind,
    owner: Option<TypeRef>,
    via_deferred: bool,
}

impl Request {
    fn site(site: &InjectionSite, owner: &TypeRef) -> Self {
        Self {
            injection: site.injection.clone(),
            site: site.kind.clone(),
            owner: Some(owner.clone()),
            via_deferred: false,
        }
    }

    fn describe_site(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{} of {}", self.site, owner),
            None => self.site.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Resolved {
    node: NodeId,
    back_reference: bool,
}

impl Resolved {
    fn node(node: NodeId) -> Self {
        Self {
            node,
            back_reference: false,
        }
    }
}

/// Builds the dependency graph of one pass, one root at a time
pub struct GraphBuilder<'a> {
    registry: RegistrySnapshot,
    metadata: &'a dyn MetadataProvider,
    config: &'a dyn ConfigProvider,
    graph: DependencyGraph,
    /// Completed shareable nodes only
    index: HashMap<NodeKey, NodeId>,
    func_arg_nodes: HashMap<(NodeId, usize), NodeId>,
    stack: ResolutionStack,
    root_names: HashSet<String>,
    seen_roots: HashSet<String>,
    next_context: usize,
    reported_ambiguities: HashSet<(BindingId, BindingId)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> GraphBuilder<'a> {
    /// `roots` is the full root list; it is used to validate root delegates
    pub fn new(
        registry: RegistrySnapshot,
        metadata: &'a dyn MetadataProvider,
        config: &'a dyn ConfigProvider,
        roots: &[RootRequest],
    ) -> Self {
        Self {
            registry,
            metadata,
            config,
            graph: DependencyGraph::default(),
            index: HashMap::new(),
            func_arg_nodes: HashMap::new(),
            stack: ResolutionStack::new(),
            root_names: roots.iter().map(|r| r.name.clone()).collect(),
            seen_roots: HashSet::new(),
            next_context: 0,
            reported_ambiguities: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Resolve every root and return the graph
    pub fn build(mut self, roots: &[RootRequest], sink: &mut dyn DiagnosticSink) -> DependencyGraph {
        for root in roots {
            self.add_root(root, sink);
        }
        self.finish()
    }

    /// Resolve one root. Returns false when it was skipped or failed; the
    /// reason has been reported to `sink`.
    pub fn add_root(&mut self, request: &RootRequest, sink: &mut dyn DiagnosticSink) -> bool {
        if !self.seen_roots.insert(request.name.clone()) {
            warn!("Duplicate composition root '{}'", request.name);
            sink.report(
                Diagnostic::error(
                    DiagnosticId::DuplicateRoot,
                    format!(
                        "Composition root '{}' is declared more than once; the later declaration is ignored",
                        request.name
                    ),
                )
                .with_location(request.location.clone())
                .with_chain(vec![request.injection.clone()])
                .with_root(&request.name),
            );
            return false;
        }

        info!("Resolving root '{}' ({})", request.name, request.injection);
        let cx = self.fresh_context();
        let req = Request {
            injection: request.injection.clone(),
            site: SiteKind::Root {
                name: request.name.clone(),
            },
            owner: None,
            via_deferred: false,
        };
        let result = self.resolve(&req, &cx);
        self.stack.clear();

        for diagnostic in self.diagnostics.drain(..) {
            sink.report(diagnostic.with_root(&request.name));
        }

        match result {
            Ok(resolved) => {
                self.graph.roots.push(RootNode {
                    request: request.clone(),
                    node: Some(resolved.node),
                });
                true
            }
            Err(error) => {
                warn!("Root '{}' abandoned: {}", request.name, error);
                let mut diagnostic = error.into_diagnostic().with_root(&request.name);
                if diagnostic.location.is_none() {
                    diagnostic.location = request.location.clone();
                }
                sink.report(diagnostic);
                self.graph.roots.push(RootNode {
                    request: request.clone(),
                    node: None,
                });
                false
            }
        }
    }

    pub fn finish(self) -> DependencyGraph {
        self.graph
    }

    fn fresh_context(&mut self) -> Context {
        let id = self.next_id();
        Context {
            block: id,
            resolve: id,
            func_args: Vec::new(),
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_context;
        self.next_context += 1;
        id
    }

    fn scope_key(lifetime: Lifetime, cx: &Context) -> ScopeKey {
        match lifetime {
            Lifetime::Singleton => ScopeKey::Global,
            Lifetime::Scoped => ScopeKey::Scope,
            Lifetime::PerResolve => ScopeKey::Resolve(cx.resolve),
            Lifetime::PerBlock => ScopeKey::Block(cx.block),
            Lifetime::Transient => ScopeKey::Unique,
        }
    }

    /// Context for the dependencies of a node with `lifetime`
    ///
    /// Persistent instances are initialized once in their own block, so
    /// they get a fresh resolve context and see no factory parameters.
    fn inner_context(&mut self, lifetime: Lifetime, cx: &Context) -> Context {
        if lifetime.is_persistent() {
            self.fresh_context()
        } else {
            cx.clone()
        }
    }

    fn resolve(&mut self, req: &Request, cx: &Context) -> Result<Resolved, ResolveError> {
        if let Some(resolved) = self.check_cycle(req)? {
            return Ok(resolved);
        }
        if let Some(node) = self.func_arg(&req.injection, cx) {
            return Ok(Resolved::node(node));
        }

        match self.registry.lookup(&req.injection, self.metadata) {
            Lookup::Found(candidate) => {
                self.note_ambiguity(&req.injection, &candidate);
                self.build_binding(req, &candidate, cx)
            }
            Lookup::ConstraintViolation { binding, reason } => match self.synthesize(req, cx)? {
                Some(resolved) => Ok(resolved),
                None => Err(ResolveError::ConstraintViolation {
                    injection: req.injection.clone(),
                    binding,
                    reason,
                    chain: self.stack.chain(&req.injection),
                    location: self.registry.binding(binding).location.clone(),
                }),
            },
            Lookup::NotFound => match self.synthesize(req, cx)? {
                Some(resolved) => Ok(resolved),
                None => Err(self.unable(req, None)),
            },
        }
    }

    fn check_cycle(&self, req: &Request) -> Result<Option<Resolved>, ResolveError> {
        match self.stack.check(&req.injection, req.via_deferred) {
            None => Ok(None),
            Some(Repeat::Accepted { node }) => {
                debug!("{} closes a deferred cycle at node {}", req.injection, node);
                Ok(Some(Resolved {
                    node,
                    back_reference: true,
                }))
            }
            Some(Repeat::Rejected { chain: cycle }) => Err(ResolveError::CircularDependency {
                cycle,
                chain: self.stack.chain(&req.injection),
            }),
        }
    }

    fn unable(&self, req: &Request, detail: Option<String>) -> ResolveError {
        let mut site = req.describe_site();
        if let Some(detail) = detail {
            site = format!("{} ({})", site, detail);
        }
        ResolveError::UnableToResolve {
            injection: req.injection.clone(),
            site,
            chain: self.stack.chain(&req.injection),
        }
    }

    fn note_ambiguity(&mut self, injection: &Injection, candidate: &Candidate) {
        let Some(other) = candidate.ambiguous_with else {
            return;
        };
        if !self.reported_ambiguities.insert((other, candidate.binding)) {
            return;
        }
        warn!(
            "{} matches bindings #{} and #{} equally well",
            injection, other, candidate.binding
        );
        self.diagnostics.push(
            Diagnostic::warning(
                DiagnosticId::AmbiguousBinding,
                format!(
                    "{} matches bindings #{} and #{} equally well; using #{}",
                    injection, other, candidate.binding, candidate.binding
                ),
            )
            .with_location(self.registry.binding(candidate.binding).location.clone())
            .with_chain(self.stack.chain(injection)),
        );
    }

    /// A parameter of an enclosing parameterized factory with this type
    fn func_arg(&mut self, injection: &Injection, cx: &Context) -> Option<NodeId> {
        if injection.tag.is_some() {
            return None;
        }
        let (deferred, index) = cx.func_args.iter().rev().find_map(|(deferred, args)| {
            args.iter()
                .position(|arg| arg == &injection.contract)
                .map(|index| (*deferred, index))
        })?;

        let node = *self
            .func_arg_nodes
            .entry((deferred, index))
            .or_insert_with(|| {
                let id = self.graph.nodes.len();
                self.graph.nodes.push(DependencyNode {
                    id,
                    kind: NodeKind::FuncArg { deferred, index },
                    ty: injection.contract.clone(),
                    lifetime: Lifetime::Transient,
                    scope: ScopeKey::Unique,
                    edges: Vec::new(),
                    location: None,
                });
                id
            });
        Some(node)
    }

    fn open_node(
        &mut self,
        req: &Request,
        ty: TypeRef,
        lifetime: Lifetime,
        scope: ScopeKey,
        location: Option<SourceLocation>,
    ) -> NodeId {
        let id = self.graph.nodes.len();
        self.graph.nodes.push(DependencyNode {
            id,
            kind: NodeKind::Pending,
            ty,
            lifetime,
            scope,
            edges: Vec::new(),
            location,
        });
        self.stack.push(req.injection.clone(), id, req.via_deferred, lifetime.is_persistent());
        id
    }

    fn close_node(&mut self, id: NodeId, kind: NodeKind, key: Option<NodeKey>) {
        self.graph.nodes[id].kind = kind;
        self.stack.pop();
        if let Some(key) = key.filter(|k| k.scope.is_shared()) {
            self.index.insert(key, id);
        }
    }

    fn connect(&mut self, from: NodeId, req: Request, cx: &Context) -> Result<(), ResolveError> {
        let result = self.resolve(&req, cx);
        self.record_edge(from, req, result)
    }

    fn record_edge(
        &mut self,
        from: NodeId,
        req: Request,
        result: Result<Resolved, ResolveError>,
    ) -> Result<(), ResolveError> {
        let id = self.graph.edges.len();
        let (to, is_back_reference) = match &result {
            Ok(resolved) => (Some(resolved.node), resolved.back_reference),
            Err(_) => (None, false),
        };
        self.graph.edges.push(InjectionEdge {
            id,
            from,
            to,
            injection: req.injection,
            site: req.site,
            is_resolved: result.is_ok(),
            is_lazy: req.via_deferred,
            is_back_reference,
        });
        self.graph.nodes[from].edges.push(id);
        result.map(|_| ())
    }

    fn build_binding(
        &mut self,
        req: &Request,
        candidate: &Candidate,
        cx: &Context,
    ) -> Result<Resolved, ResolveError> {
        let binding = self.registry.binding(candidate.binding).clone();
        debug!("{} -> binding #{}", req.injection, binding.id);

        match &binding.producer {
            Producer::Implementation { ty } => {
                let closed = ty.substitute(&candidate.substitution);
                if closed.is_open() {
                    return Err(ResolveError::NoSuitableConstructor {
                        ty: closed,
                        reason: "generic markers are left unbound".to_string(),
                        chain: self.stack.chain(&req.injection),
                        location: binding.location.clone(),
                    });
                }
                let location = binding.location.clone();
                self.build_construct(req, Some(binding.id), closed, binding.lifetime, location, cx)
            }
            Producer::Factory(factory) => self.build_factory(
                req,
                binding.id,
                binding.lifetime,
                factory,
                candidate,
                binding.location.clone(),
                cx,
            ),
            Producer::Arg { name } => {
                let ty = req.injection.contract.clone();
                let key = NodeKey {
                    binding: Some(binding.id),
                    ty: ty.clone(),
                    scope: ScopeKey::Global,
                };
                if let Some(&existing) = self.index.get(&key) {
                    return Ok(Resolved::node(existing));
                }
                let location = binding.location.clone();
                let id = self.open_node(req, ty, binding.lifetime, ScopeKey::Global, location);
                let kind = NodeKind::Arg {
                    binding: binding.id,
                    name: name.clone(),
                };
                self.close_node(id, kind, Some(key));
                Ok(Resolved::node(id))
            }
            Producer::RootDelegate { root } => {
                if !self.root_names.contains(root) {
                    let detail = format!("no composition root named '{}'", root);
                    return Err(self.unable(req, Some(detail)));
                }
                let ty = req.injection.contract.clone();
                let scope = Self::scope_key(binding.lifetime, cx);
                let key = NodeKey {
                    binding: Some(binding.id),
                    ty: ty.clone(),
                    scope: scope.clone(),
                };
                if let Some(&existing) = self.index.get(&key) {
                    return Ok(Resolved::node(existing));
                }
                let id = self.open_node(req, ty, binding.lifetime, scope, binding.location.clone());
                let kind = NodeKind::RootDelegate {
                    binding: binding.id,
                    root: root.clone(),
                };
                self.close_node(id, kind, Some(key));
                Ok(Resolved::node(id))
            }
        }
    }

    fn build_construct(
        &mut self,
        req: &Request,
        binding: Option<BindingId>,
        ty: TypeRef,
        lifetime: Lifetime,
        location: Option<SourceLocation>,
        cx: &Context,
    ) -> Result<Resolved, ResolveError> {
        let scope = Self::scope_key(lifetime, cx);
        let key = NodeKey {
            binding,
            ty: ty.clone(),
            scope: scope.clone(),
        };
        if let Some(&existing) = self.index.get(&key) {
            return Ok(Resolved::node(existing));
        }

        let inner = self.inner_context(lifetime, cx);
        let extracted = {
            let resolvable = |injection: &Injection| self.can_resolve(injection, &inner);
            SiteExtractor::new(self.metadata).extract(&ty, &resolvable)
        };
        let plan = extracted.map_err(|error| match error {
            ExtractError::NoSuitableConstructor { ty, reason } => ResolveError::NoSuitableConstructor {
                ty,
                reason,
                chain: self.stack.chain(&req.injection),
                location: location.clone(),
            },
        })?;

        let id = self.open_node(req, ty.clone(), lifetime, scope, location);
        for site in plan.sites() {
            self.connect(id, Request::site(site, &ty), &inner)?;
        }
        self.close_node(id, NodeKind::Construct { binding, plan }, Some(key));
        Ok(Resolved::node(id))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_factory(
        &mut self,
        req: &Request,
        binding: BindingId,
        lifetime: Lifetime,
        factory: &Factory,
        candidate: &Candidate,
        location: Option<SourceLocation>,
        cx: &Context,
    ) -> Result<Resolved, ResolveError> {
        let ty = req.injection.contract.clone();
        let scope = Self::scope_key(lifetime, cx);
        let key = NodeKey {
            binding: Some(binding),
            ty: ty.clone(),
            scope: scope.clone(),
        };
        if let Some(&existing) = self.index.get(&key) {
            return Ok(Resolved::node(existing));
        }

        let inner = self.inner_context(lifetime, cx);
        let id = self.open_node(req, ty.clone(), lifetime, scope, location);
        for injection in &factory.injections {
            let site = Request {
                injection: injection.injection.substitute(&candidate.substitution),
                site: SiteKind::FactoryInjection {
                    name: injection.name.clone(),
                },
                owner: Some(ty.clone()),
                via_deferred: false,
            };
            self.connect(id, site, &inner)?;
        }

        let kind = NodeKind::Factory {
            binding,
            expression: factory.expression.clone(),
            names: factory.injections.iter().map(|i| i.name.clone()).collect(),
        };
        self.close_node(id, kind, Some(key));
        Ok(Resolved::node(id))
    }

    /// Collection, deferred wrapper, tuple or auto-bound type for a request
    /// without a usable binding
    fn synthesize(&mut self, req: &Request, cx: &Context) -> Result<Option<Resolved>, ResolveError> {
        let resolved = match ContractShape::of(&req.injection.contract) {
            ContractShape::Sequence { kind, element } => self.build_collection(req, kind, element, cx)?,
            ContractShape::Deferred { kind, args, value } => {
                self.build_deferred(req, kind, args, value, cx)?
            }
            ContractShape::Tuple(items) => self.build_tuple(req, items, cx)?,
            ContractShape::Plain => {
                if !self.auto_bindable(&req.injection) {
                    return Ok(None);
                }
                debug!("{} auto-bound to itself", req.injection);
                let lifetime = self.config.default_lifetime();
                self.build_construct(req, None, req.injection.contract.clone(), lifetime, None, cx)?
            }
        };
        Ok(Some(resolved))
    }

    fn build_collection(
        &mut self,
        req: &Request,
        kind: CollectionKind,
        element: TypeRef,
        cx: &Context,
    ) -> Result<Resolved, ResolveError> {
        let contract = req.injection.contract.clone();
        let candidates = self.registry.bindings_for_element(&element, self.metadata);
        debug!("{} gathers {} element(s)", contract, candidates.len());

        let id = self.open_node(req, contract.clone(), Lifetime::Transient, ScopeKey::Unique, None);
        for (index, candidate) in candidates.iter().enumerate() {
            let element_req = Request {
                injection: Injection::new(element.clone(), candidate.tag.clone()),
                site: SiteKind::CollectionElement { index },
                owner: Some(contract.clone()),
                via_deferred: false,
            };
            let result = match self.check_cycle(&element_req) {
                Ok(Some(resolved)) => Ok(resolved),
                Ok(None) => self.build_binding(&element_req, candidate, cx),
                Err(error) => Err(error),
            };
            self.record_edge(id, element_req, result)?;
        }

        self.close_node(id, NodeKind::Collection { kind, element }, None);
        Ok(Resolved::node(id))
    }

    fn build_deferred(
        &mut self,
        req: &Request,
        kind: DeferredKind,
        args: Vec<TypeRef>,
        value: TypeRef,
        cx: &Context,
    ) -> Result<Resolved, ResolveError> {
        let contract = req.injection.contract.clone();
        let id = self.open_node(req, contract.clone(), Lifetime::Transient, ScopeKey::Unique, None);

        let block = self.next_id();
        let mut func_args = cx.func_args.clone();
        if !args.is_empty() {
            func_args.push((id, args.clone()));
        }
        let inner = Context {
            block,
            resolve: cx.resolve,
            func_args,
        };

        let value_req = Request {
            injection: Injection::new(value.clone(), req.injection.tag.clone()),
            site: SiteKind::DeferredValue,
            owner: Some(contract),
            via_deferred: true,
        };
        self.connect(id, value_req, &inner)?;

        let kind = NodeKind::Deferred {
            kind,
            args,
            value,
            block,
        };
        self.close_node(id, kind, None);
        Ok(Resolved::node(id))
    }

    fn build_tuple(&mut self, req: &Request, items: Vec<TypeRef>, cx: &Context) -> Result<Resolved, ResolveError> {
        let contract = req.injection.contract.clone();
        let id = self.open_node(req, contract.clone(), Lifetime::Transient, ScopeKey::Unique, None);

        for (index, item) in items.into_iter().enumerate() {
            let item_req = Request {
                injection: Injection::untagged(item),
                site: SiteKind::TupleElement { index },
                owner: Some(contract.clone()),
                via_deferred: false,
            };
            self.connect(id, item_req, cx)?;
        }

        self.close_node(id, NodeKind::Tuple, None);
        Ok(Resolved::node(id))
    }

    /// Untagged request for a known concrete type whose generic arity matches
    fn auto_bindable(&self, injection: &Injection) -> bool {
        if !self.config.auto_bind() || injection.tag.is_some() || injection.contract.is_open() {
            return false;
        }
        let Some(name) = injection.contract.name() else {
            return false;
        };
        self.metadata
            .type_info(name)
            .map(|info| info.is_concrete() && info.generic_params.len() == injection.contract.args().len())
            .unwrap_or(false)
    }

    /// Shallow resolvability check used to rank constructors
    fn can_resolve(&self, injection: &Injection, cx: &Context) -> bool {
        if injection.tag.is_none()
            && cx
                .func_args
                .iter()
                .any(|(_, args)| args.contains(&injection.contract))
        {
            return true;
        }
        if matches!(
            self.registry.lookup(injection, self.metadata),
            Lookup::Found(_)
        ) {
            return true;
        }
        match ContractShape::of(&injection.contract) {
            ContractShape::Sequence { .. } => true,
            ContractShape::Deferred { value, .. } => {
                self.can_resolve(&Injection::new(value, injection.tag.clone()), cx)
            }
            ContractShape::Tuple(items) => items
                .into_iter()
                .all(|item| self.can_resolve(&Injection::untagged(item), cx)),
            ContractShape::Plain => self.auto_bindable(injection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::mocks::{root, ty, Scenario, TypeBuilder};
    use crate::registry::{Binding, FactoryInjection};
    use stitch_core::{Severity, Tag};

    fn root_node(graph: &DependencyGraph, index: usize) -> NodeId {
        graph.roots()[index].node.unwrap()
    }

    fn targets(graph: &DependencyGraph, node: NodeId) -> Vec<NodeId> {
        graph.outgoing(node).filter_map(|e| e.to).collect()
    }

    #[test]
    fn test_singleton_shared_transient_distinct() {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("Service").ctor(&[("a", "IDependency"), ("b", "IDependency"), ("c", "ILog"), ("d", "ILog")]),
            TypeBuilder::class("Dependency"),
            TypeBuilder::class("Log"),
        ]);
        fixture.bind("IService", "Service", Lifetime::Transient);
        fixture.bind("IDependency", "Dependency", Lifetime::Transient);
        fixture.bind("ILog", "Log", Lifetime::Singleton);

        let graph = fixture.build(&[root("Root", "IService")]);
        assert!(!fixture.sink.has_errors());

        let service = root_node(&graph, 0);
        let deps = targets(&graph, service);
        assert_eq!(deps.len(), 4);
        assert_ne!(deps[0], deps[1]);
        assert_eq!(deps[2], deps[3]);
        assert_eq!(graph.node(deps[2]).scope, ScopeKey::Global);
    }

    #[test]
    fn test_per_resolve_shared_within_root_only() {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("Service").ctor(&[("a", "IDependency"), ("b", "IDependency")]),
            TypeBuilder::class("Dependency"),
        ]);
        fixture.bind("IService", "Service", Lifetime::Transient);
        fixture.bind("IDependency", "Dependency", Lifetime::PerResolve);

        let graph = fixture.build(&[root("First", "IService"), root("Second", "IService")]);
        let first = targets(&graph, root_node(&graph, 0));
        let second = targets(&graph, root_node(&graph, 1));
        assert_eq!(first[0], first[1]);
        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn test_eager_cycle_is_circular_dependency() {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("A").ctor(&[("b", "IB")]),
            TypeBuilder::class("B").ctor(&[("a", "IA")]),
        ]);
        fixture.bind("IA", "A", Lifetime::Transient);
        fixture.bind("IB", "B", Lifetime::Transient);

        let graph = fixture.build(&[root("Root", "IA")]);
        let cycles = fixture.sink.with_id(DiagnosticId::CircularDependency);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].message, "Circular dependency: IA -> IB -> IA");
        assert_eq!(cycles[0].root.as_deref(), Some("Root"));
        assert!(!graph.roots()[0].is_resolved());
    }

    #[test]
    fn test_cycle_through_lazy_is_accepted() {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("Tool").ctor(&[("view", "Lazy<IView>")]),
            TypeBuilder::class("View").ctor(&[("model", "IModel")]),
            TypeBuilder::abstract_class("ModelBase").property("Tool", "ITool", Some(0)),
            TypeBuilder::class("Model").base("ModelBase"),
        ]);
        fixture.bind("ITool", "Tool", Lifetime::Transient);
        fixture.bind("IView", "View", Lifetime::Transient);
        fixture.bind("IModel", "Model", Lifetime::Transient);

        let graph = fixture.build(&[root("Root", "ITool")]);
        assert!(fixture.sink.diagnostics().is_empty(), "{:?}", fixture.sink.diagnostics());

        let tool = root_node(&graph, 0);
        let lazy: Vec<_> = graph.edges().iter().filter(|e| e.is_lazy).collect();
        assert_eq!(lazy.len(), 1);
        assert_eq!(lazy[0].injection.to_string(), "IView");

        let back: Vec<_> = graph.edges().iter().filter(|e| e.is_back_reference).collect();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].to, Some(tool));
        assert_eq!(back[0].site, SiteKind::Property { name: "Tool".to_string() });
        assert!(graph.verify_acyclic().is_ok());
    }

    #[test]
    fn test_auto_collection_in_registration_order() {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("A"),
            TypeBuilder::class("B"),
            TypeBuilder::class("C"),
        ]);
        fixture.bind_tagged("IDependency", Some(Tag::text("a")), "A", Lifetime::Transient);
        fixture.bind_tagged("IDependency", Some(Tag::Int(2)), "B", Lifetime::Transient);
        fixture.bind_tagged("IDependency", Some(Tag::Enum("Kind.C".to_string())), "C", Lifetime::Transient);

        let graph = fixture.build(&[root("All", "IDependency[]")]);
        let array = root_node(&graph, 0);
        assert!(matches!(graph.node(array).kind, NodeKind::Collection { kind: CollectionKind::Array, .. }));

        let elements: Vec<String> = targets(&graph, array)
            .into_iter()
            .map(|n| graph.node(n).ty.to_string())
            .collect();
        assert_eq!(elements, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_explicit_sequence_binding_overrides_gathering() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("A"), TypeBuilder::class("Many")]);
        fixture.bind("IDependency", "A", Lifetime::Transient);
        fixture.bind("IDependency[]", "Many", Lifetime::Transient);

        let graph = fixture.build(&[root("All", "IDependency[]")]);
        let node = graph.node(root_node(&graph, 0));
        assert_eq!(node.ty, ty("Many"));
    }

    #[test]
    fn test_tuple_with_one_unresolvable_element() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Dependency")]);
        fixture.bind("IDependency", "Dependency", Lifetime::Transient);

        let graph = fixture.build(&[root("Pair", "(IDependency, IMissing)")]);
        let errors = fixture.sink.with_id(DiagnosticId::UnableToResolve);
        assert_eq!(errors.len(), 1);
        assert_eq!(fixture.sink.error_count(), 1);
        assert!(errors[0].message.contains("IMissing"));
        assert!(errors[0].message.contains("tuple item #1"));
        assert_eq!(errors[0].chain_text(), "(IDependency, IMissing) -> IMissing");
        assert!(graph.edges().iter().any(|e| !e.is_resolved));
    }

    #[test]
    fn test_failed_root_does_not_stop_others() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Dependency")]);
        fixture.bind("IDependency", "Dependency", Lifetime::Transient);

        let graph = fixture.build(&[root("Broken", "IMissing"), root("Fine", "IDependency")]);
        assert!(!graph.roots()[0].is_resolved());
        assert!(graph.roots()[1].is_resolved());
        assert_eq!(fixture.sink.error_count(), 1);
    }

    #[test]
    fn test_duplicate_root_keeps_first() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Dependency")]);
        let graph = fixture.build(&[root("Root", "Dependency"), root("Root", "Other")]);

        assert_eq!(graph.roots().len(), 1);
        assert!(graph.roots()[0].is_resolved());
        assert_eq!(fixture.sink.with_id(DiagnosticId::DuplicateRoot).len(), 1);
    }

    #[test]
    fn test_auto_bind_uses_default_lifetime_and_respects_config() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Service"), TypeBuilder::interface("IService")]);
        fixture.config.default_lifetime = Lifetime::Singleton;

        let graph = fixture.build(&[root("Root", "Service"), root("Iface", "IService")]);
        let node = graph.node(root_node(&graph, 0));
        assert_eq!(node.lifetime, Lifetime::Singleton);
        assert!(matches!(node.kind, NodeKind::Construct { binding: None, .. }));
        assert!(!graph.roots()[1].is_resolved());

        let mut fixture = Scenario::new(vec![TypeBuilder::class("Service")]);
        fixture.config.auto_bind = false;
        let graph = fixture.build(&[root("Root", "Service")]);
        assert!(!graph.roots()[0].is_resolved());
    }

    #[test]
    fn test_open_generic_binding_is_closed() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Box")
            .generic_params(&["T"])
            .ctor(&[("value", "T")])]);
        fixture.bind("IBox<TT>", "Box<TT>", Lifetime::Transient);
        fixture.bind("int", "Zero", Lifetime::Transient);

        let graph = fixture.build(&[root("Root", "IBox<int>")]);
        let boxed = root_node(&graph, 0);
        assert_eq!(graph.node(boxed).ty, ty("Box<int>"));
        let value = targets(&graph, boxed)[0];
        assert_eq!(graph.node(value).ty, ty("Zero"));
    }

    #[test]
    fn test_func_arguments_are_injectable() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Service").ctor(&[("id", "int"), ("name", "string")])]);
        fixture.bind("IService", "Service", Lifetime::Transient);
        fixture.bind("string", "Name", Lifetime::Transient);

        let graph = fixture.build(&[root("Make", "Func<int, IService>")]);
        assert!(!fixture.sink.has_errors(), "{:?}", fixture.sink.diagnostics());

        let func = root_node(&graph, 0);
        let service = targets(&graph, func)[0];
        let args = targets(&graph, service);
        assert_eq!(graph.node(args[0]).kind, NodeKind::FuncArg { deferred: func, index: 0 });
        assert_eq!(graph.node(args[1]).ty, ty("Name"));
    }

    #[test]
    fn test_factory_and_root_delegate() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Dependency")]);
        fixture.bind("IDependency", "Dependency", Lifetime::Transient);
        fixture.register(Binding::new(
            vec![ty("IService")],
            Lifetime::Transient,
            Producer::Factory(Factory {
                expression: "new Service(dep)".to_string(),
                injections: vec![FactoryInjection {
                    name: "dep".to_string(),
                    injection: Injection::untagged(ty("IDependency")),
                }],
            }),
        ));
        fixture.register(Binding::new(
            vec![ty("IOther")],
            Lifetime::Transient,
            Producer::RootDelegate { root: "Service".to_string() },
        ));
        fixture.register(Binding::new(
            vec![ty("IBroken")],
            Lifetime::Transient,
            Producer::RootDelegate { root: "Nowhere".to_string() },
        ));

        let graph = fixture.build(&[
            root("Service", "IService"),
            root("Other", "IOther"),
            root("Broken", "IBroken"),
        ]);
        let factory = graph.node(root_node(&graph, 0));
        assert!(matches!(&factory.kind, NodeKind::Factory { names, .. } if names == &vec!["dep".to_string()]));
        assert!(matches!(graph.node(root_node(&graph, 1)).kind, NodeKind::RootDelegate { .. }));

        let errors = fixture.sink.with_id(DiagnosticId::UnableToResolve);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Nowhere"));
    }

    #[test]
    fn test_ambiguous_open_generics_warn() {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("A").generic_params(&["T"]),
            TypeBuilder::class("B").generic_params(&["T"]),
        ]);
        fixture.bind("IMap<TT, int>", "A<TT>", Lifetime::Transient);
        fixture.bind("IMap<string, TT>", "B<TT>", Lifetime::Transient);

        let graph = fixture.build(&[root("Root", "IMap<string, int>")]);
        assert_eq!(graph.node(root_node(&graph, 0)).ty, ty("B<int>"));
        let warnings = fixture.sink.with_id(DiagnosticId::AmbiguousBinding);
        assert_eq!(warnings.len(), 1);
        assert!(!fixture.sink.has_errors());
    }

    #[test]
    fn test_no_suitable_constructor_is_fatal() {
        let mut fixture = Scenario::new(vec![TypeBuilder::class("Hidden").private_ctor(&[])]);
        fixture.bind("IHidden", "Hidden", Lifetime::Transient);

        fixture.build(&[root("Root", "IHidden")]);
        assert_eq!(fixture.sink.with_id(DiagnosticId::NoSuitableConstructor).len(), 1);
    }

    fn singleton_behind_lazy_cycle() -> Scenario {
        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("A").ctor(&[("s", "IS")]),
            TypeBuilder::class("S").ctor(&[("a", "Lazy<IA>")]),
        ]);
        fixture.bind("IA", "A", Lifetime::Transient);
        fixture.bind("IS", "S", Lifetime::Singleton);
        fixture
    }

    #[test]
    fn test_singleton_cycle_stays_inside_its_own_context() {
        for roots in [
            [root("First", "IA"), root("Second", "IS")],
            [root("Second", "IS"), root("First", "IA")],
        ] {
            let mut fixture = singleton_behind_lazy_cycle();
            let graph = fixture.build(&roots);
            assert!(fixture.sink.diagnostics().is_empty(), "{:?}", fixture.sink.diagnostics());
            assert!(graph.roots().iter().all(RootNode::is_resolved));
            assert!(graph.verify_acyclic().is_ok());

            // Every back reference lands on the singleton, never on a root's own A
            let singleton = graph
                .nodes()
                .iter()
                .find(|n| n.ty == ty("S"))
                .map(|n| n.id)
                .unwrap();
            let back: Vec<_> = graph.edges().iter().filter(|e| e.is_back_reference).collect();
            assert_eq!(back.len(), 1);
            assert_eq!(back[0].to, Some(singleton));
        }
    }

    #[test]
    fn test_constraint_violation_abandons_root() {
        let mut markers = crate::unify::MarkerSet::new();
        markers.declare("TT", vec![crate::unify::Constraint::ValueType]);

        let mut fixture = Scenario::new(vec![
            TypeBuilder::class("Box").generic_params(&["T"]),
            TypeBuilder::class("Service"),
        ]);
        fixture.registry = crate::registry::BindingRegistry::with_markers(markers);
        fixture.bind("IBox<TT>", "Box<TT>", Lifetime::Transient);

        let graph = fixture.build(&[root("Broken", "IBox<Service>"), root("Fine", "IBox<int>")]);

        assert!(!graph.roots()[0].is_resolved());
        assert!(graph.roots()[1].is_resolved());
        assert_eq!(graph.node(root_node(&graph, 1)).ty, ty("Box<int>"));

        assert_eq!(fixture.sink.error_count(), 1);
        let violations = fixture.sink.with_id(DiagnosticId::ConstraintViolation);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, Severity::Error);
        assert_eq!(violations[0].root.as_deref(), Some("Broken"));
        assert!(violations[0].message.contains("value type"));
    }
}
