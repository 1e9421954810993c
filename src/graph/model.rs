//! Resolved dependency graph for one generator pass

use crate::core::{StitchError, StitchResult};
use crate::injection::{InjectionPlan, SiteKind};
use crate::registry::BindingId;
use crate::unify::{CollectionKind, DeferredKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write as _;
use stitch_core::{Injection, Lifetime, SourceLocation, TypeRef};

pub type NodeId = usize;
pub type EdgeId = usize;

/// Identifier of an emitted block; root bodies, deferred thunks and
/// persistent initializers each get their own
pub type BlockId = usize;

/// The sharing context that, together with binding and closed type,
/// identifies an instance site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case", tag = "scope", content = "id")]
pub enum ScopeKey {
    Global,
    Scope,
    /// One root resolution call (or one persistent initializer)
    Resolve(usize),
    Block(BlockId),
    /// Never shared
    Unique,
}

impl ScopeKey {
    pub fn is_shared(&self) -> bool {
        *self != ScopeKey::Unique
    }
}

/// What a node produces and how
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Placeholder for a node whose dependencies are still being resolved
    Pending,
    /// Constructor call; `binding` is `None` for auto-bound types
    Construct {
        binding: Option<BindingId>,
        plan: InjectionPlan,
    },
    Factory {
        binding: BindingId,
        expression: String,
        /// Names the expression uses for its injections, in edge order
        names: Vec<String>,
    },
    Arg {
        binding: BindingId,
        name: String,
    },
    RootDelegate {
        binding: BindingId,
        root: String,
    },
    Collection {
        kind: CollectionKind,
        element: TypeRef,
    },
    Deferred {
        kind: DeferredKind,
        args: Vec<TypeRef>,
        value: TypeRef,
        block: BlockId,
    },
    Tuple,
    /// Parameter `index` of the enclosing parameterized factory `deferred`
    FuncArg {
        deferred: NodeId,
        index: usize,
    },
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Pending => "pending",
            NodeKind::Construct { binding: None, .. } => "auto",
            NodeKind::Construct { .. } => "construct",
            NodeKind::Factory { .. } => "factory",
            NodeKind::Arg { .. } => "arg",
            NodeKind::RootDelegate { .. } => "root",
            NodeKind::Collection { .. } => "collection",
            NodeKind::Deferred { .. } => "deferred",
            NodeKind::Tuple => "tuple",
            NodeKind::FuncArg { .. } => "func-arg",
        }
    }

    pub fn binding(&self) -> Option<BindingId> {
        match self {
            NodeKind::Construct { binding, .. } => *binding,
            NodeKind::Factory { binding, .. }
            | NodeKind::Arg { binding, .. }
            | NodeKind::RootDelegate { binding, .. } => Some(*binding),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Closed type of the produced value
    pub ty: TypeRef,
    pub lifetime: Lifetime,
    pub scope: ScopeKey,
    /// Outgoing edges in injection order
    pub edges: Vec<EdgeId>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InjectionEdge {
    pub id: EdgeId,
    pub from: NodeId,
    /// `None` when the injection could not be resolved
    pub to: Option<NodeId>,
    pub injection: Injection,
    pub site: SiteKind,
    pub is_resolved: bool,
    /// Enters a deferred wrapper's value; excluded from eager ordering
    pub is_lazy: bool,
    /// Refers back to a node still under construction on the cycle
    pub is_back_reference: bool,
}

impl InjectionEdge {
    /// Resolved and not lazy
    pub fn is_eager(&self) -> bool {
        self.is_resolved && !self.is_lazy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootAccess {
    #[default]
    Public,
    Internal,
    Private,
}

/// A requested composition root
#[derive(Debug, Clone, PartialEq)]
pub struct RootRequest {
    pub name: String,
    pub injection: Injection,
    pub access: RootAccess,
    pub location: Option<SourceLocation>,
}

impl RootRequest {
    pub fn new(name: impl Into<String>, injection: Injection) -> Self {
        Self {
            name: name.into(),
            injection,
            access: RootAccess::Public,
            location: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootNode {
    pub request: RootRequest,
    /// `None` when resolution of the root failed
    pub node: Option<NodeId>,
}

impl RootNode {
    pub fn is_resolved(&self) -> bool {
        self.node.is_some()
    }
}

/// Vertices, edges and roots produced by the graph builder
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(crate) nodes: Vec<DependencyNode>,
    pub(crate) edges: Vec<InjectionEdge>,
    pub(crate) roots: Vec<RootNode>,
}

impl DependencyGraph {
    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id]
    }

    pub fn edge(&self, id: EdgeId) -> &InjectionEdge {
        &self.edges[id]
    }

    pub fn nodes(&self) -> &[DependencyNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[InjectionEdge] {
        &self.edges
    }

    pub fn roots(&self) -> &[RootNode] {
        &self.roots
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &InjectionEdge> {
        self.nodes[node].edges.iter().map(move |&e| &self.edges[e])
    }

    /// Roots that resolved successfully, in declaration order
    pub fn resolved_roots(&self) -> impl Iterator<Item = (&RootRequest, NodeId)> {
        self.roots
            .iter()
            .filter_map(|r| r.node.map(|node| (&r.request, node)))
    }

    /// Every node reachable from a resolved root, lazy edges included
    pub fn reachable(&self) -> BTreeSet<NodeId> {
        let mut reached = BTreeSet::new();
        let mut pending: Vec<NodeId> = self.resolved_roots().map(|(_, node)| node).collect();

        while let Some(node) = pending.pop() {
            if !reached.insert(node) {
                continue;
            }
            pending.extend(self.outgoing(node).filter_map(|e| e.to));
        }
        reached
    }

    /// Check that eager edges of the resolved part form no cycle
    pub fn verify_acyclic(&self) -> StitchResult<()> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in self.reachable() {
            if !visited.contains(&node) {
                self.detect_cycle_dfs(node, &mut visited, &mut rec_stack)?;
            }
        }

        Ok(())
    }

    fn detect_cycle_dfs(
        &self,
        node: NodeId,
        visited: &mut HashSet<NodeId>,
        rec_stack: &mut HashSet<NodeId>,
    ) -> StitchResult<()> {
        visited.insert(node);
        rec_stack.insert(node);

        for edge in self.outgoing(node).filter(|e| e.is_eager() && !e.is_back_reference) {
            let Some(dep) = edge.to else { continue };
            if !visited.contains(&dep) {
                self.detect_cycle_dfs(dep, visited, rec_stack)?;
            } else if rec_stack.contains(&dep) {
                return Err(StitchError::Invariant(format!(
                    "Eager cycle in dependency graph: {} -> {}",
                    self.nodes[node].ty, self.nodes[dep].ty
                )));
            }
        }

        rec_stack.remove(&node);
        Ok(())
    }

    /// Serializable read-only view
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            vertices: self
                .nodes
                .iter()
                .map(|n| VertexSnapshot {
                    id: n.id,
                    kind: n.kind.label(),
                    ty: n.ty.clone(),
                    lifetime: n.lifetime,
                    scope: n.scope.clone(),
                    binding: n.kind.binding(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| EdgeSnapshot {
                    from: e.from,
                    to: e.to,
                    injection: e.injection.clone(),
                    site: e.site.to_string(),
                    resolved: e.is_resolved,
                    lazy: e.is_lazy,
                    back_reference: e.is_back_reference,
                })
                .collect(),
            roots: self
                .roots
                .iter()
                .map(|r| RootSnapshot {
                    name: r.request.name.clone(),
                    injection: r.request.injection.clone(),
                    node: r.node,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub vertices: Vec<VertexSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub roots: Vec<RootSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VertexSnapshot {
    pub id: NodeId,
    pub kind: &'static str,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub lifetime: Lifetime,
    pub scope: ScopeKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeSnapshot {
    pub from: NodeId,
    pub to: Option<NodeId>,
    pub injection: Injection,
    pub site: String,
    pub resolved: bool,
    pub lazy: bool,
    pub back_reference: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RootSnapshot {
    pub name: String,
    pub injection: Injection,
    pub node: Option<NodeId>,
}

impl GraphSnapshot {
    /// Render as a Graphviz digraph
    ///
    /// Lazy edges are dashed, back references dotted, unresolved
    /// injections point at a red placeholder.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph stitch {\n    rankdir=LR;\n");

        for root in &self.roots {
            let _ = writeln!(
                dot,
                "    \"root_{}\" [label=\"{}\", shape=box, style=bold];",
                root.name,
                escape(&root.name)
            );
            if let Some(node) = root.node {
                let _ = writeln!(dot, "    \"root_{}\" -> n{};", root.name, node);
            }
        }

        for vertex in &self.vertices {
            let _ = writeln!(
                dot,
                "    n{} [label=\"{}\\n{} ({})\"];",
                vertex.id,
                escape(&vertex.ty.to_string()),
                vertex.kind,
                vertex.lifetime
            );
        }

        for (index, edge) in self.edges.iter().enumerate() {
            let label = escape(&edge.injection.to_string());
            match edge.to {
                Some(to) => {
                    let style = if edge.lazy {
                        ", style=dashed"
                    } else if edge.back_reference {
                        ", style=dotted"
                    } else {
                        ""
                    };
                    let _ = writeln!(dot, "    n{} -> n{} [label=\"{}\"{}];", edge.from, to, label, style);
                }
                None => {
                    let _ = writeln!(dot, "    missing{} [label=\"?\", color=red];", index);
                    let _ = writeln!(
                        dot,
                        "    n{} -> missing{} [label=\"{}\", color=red];",
                        edge.from, index, label
                    );
                }
            }
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
