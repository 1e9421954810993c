use super::code::{
    ArgDecl, Call, CallKind, CompositionCode, Expr, Param, RootCode, Statement, Thunk, Var,
};
use crate::core::{StitchError, StitchResult};
use crate::di::ConfigProvider;
use crate::graph::{DependencyGraph, DependencyNode, InjectionEdge, NodeId, NodeKind, RootRequest};
use crate::planner::{Names, Plan, Storage};
use crate::unify::DeferredKind;
use std::collections::{HashMap, HashSet};
use std::mem;
use stitch_core::Lifetime;
use tracing::{debug, info};

/// Turns a planned graph into statements, one body per resolved root
pub struct Emitter<'a> {
    graph: &'a DependencyGraph,
    plan: &'a Plan,
    thread_safe: bool,
}

impl<'a> Emitter<'a> {
    pub fn new(graph: &'a DependencyGraph, plan: &'a Plan, config: &dyn ConfigProvider) -> Self {
        Self {
            graph,
            plan,
            thread_safe: config.thread_safe(),
        }
    }

    pub fn emit(&self, composition: &str) -> StitchResult<CompositionCode> {
        info!("Emitting composition '{}'", composition);

        let fields = self
            .plan
            .field_order()
            .iter()
            .map(|&id| {
                let node = self.graph.node(id);
                match self.plan.storage(id) {
                    Some(Storage::Field { name }) => Ok(Statement::DeclareField {
                        name: name.clone(),
                        ty: node.ty.clone(),
                        lifetime: node.lifetime,
                    }),
                    other => Err(unplanned(id, other)),
                }
            })
            .collect::<StitchResult<Vec<_>>>()?;

        let args = self
            .plan
            .args()
            .iter()
            .map(|&id| match self.plan.storage(id) {
                Some(Storage::Arg { name }) => Ok(ArgDecl {
                    name: name.clone(),
                    ty: self.graph.node(id).ty.clone(),
                }),
                other => Err(unplanned(id, other)),
            })
            .collect::<StitchResult<Vec<_>>>()?;

        let roots = self
            .graph
            .resolved_roots()
            .map(|(request, node)| RootEmitter::new(self).emit(request, node))
            .collect::<StitchResult<Vec<_>>>()?;

        let fingerprint = fingerprint(&fields, &args, &roots)?;
        debug!("Composition '{}' fingerprint {}", composition, fingerprint);

        Ok(CompositionCode {
            composition: composition.to_string(),
            fields,
            args,
            roots,
            fingerprint,
        })
    }
}

/// blake3 hex digest of the canonical JSON of the generated parts
pub fn fingerprint(fields: &[Statement], args: &[ArgDecl], roots: &[RootCode]) -> StitchResult<String> {
    let json = serde_json::to_vec(&(fields, args, roots))?;
    Ok(hex::encode(blake3::hash(&json).as_bytes()))
}

fn unplanned(id: NodeId, storage: Option<&Storage>) -> StitchError {
    StitchError::Invariant(format!("node {} has unexpected storage {:?}", id, storage))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Root,
    /// Body of a persistent field initializer
    Initializer,
    Thunk,
    /// Body of a guarded local initialization
    Guard,
}

impl BlockKind {
    /// Locals do not cross into or out of a barrier
    fn is_barrier(self) -> bool {
        matches!(self, BlockKind::Root | BlockKind::Initializer)
    }
}

struct Block {
    kind: BlockKind,
    statements: Vec<Statement>,
    locals: HashMap<NodeId, String>,
    /// Nodes known to be initialized from this point on
    ensured: HashSet<NodeId>,
    /// Leading declarations moved up from nested blocks
    hoisted: usize,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            statements: Vec::new(),
            locals: HashMap::new(),
            ensured: HashSet::new(),
            hoisted: 0,
        }
    }
}

/// What a producer yields before it is stored
enum Produced {
    Call(Call),
    Value(Expr),
}

struct RootEmitter<'e> {
    graph: &'e DependencyGraph,
    plan: &'e Plan,
    thread_safe: bool,
    names: Names,
    current: Block,
    outer: Vec<Block>,
    /// Persistent fields whose initializer is being emitted
    in_progress: HashSet<NodeId>,
    constructing: HashSet<NodeId>,
    /// Locals declared in an enclosing block and initialized on demand
    hoisted: HashSet<NodeId>,
    params: HashMap<(NodeId, usize), String>,
}

impl<'e> RootEmitter<'e> {
    fn new(emitter: &Emitter<'e>) -> Self {
        Self {
            graph: emitter.graph,
            plan: emitter.plan,
            thread_safe: emitter.thread_safe,
            names: Names::new(),
            current: Block::new(BlockKind::Root),
            outer: Vec::new(),
            in_progress: HashSet::new(),
            constructing: HashSet::new(),
            hoisted: HashSet::new(),
            params: HashMap::new(),
        }
    }

    fn emit(mut self, request: &RootRequest, node: NodeId) -> StitchResult<RootCode> {
        debug!("Emitting root '{}'", request.name);
        let value = self.value(node)?;
        self.push(Statement::Return { value });

        Ok(RootCode {
            name: request.name.clone(),
            ty: request.injection.contract.clone(),
            access: request.access,
            body: self.current.statements,
        })
    }

    fn push(&mut self, statement: Statement) {
        self.current.statements.push(statement);
    }

    fn push_block(&mut self, kind: BlockKind) {
        let outer = mem::replace(&mut self.current, Block::new(kind));
        self.outer.push(outer);
    }

    fn pop_block(&mut self) -> StitchResult<Vec<Statement>> {
        let outer = self
            .outer
            .pop()
            .ok_or_else(|| StitchError::Invariant("block stack underflow".to_string()))?;
        Ok(mem::replace(&mut self.current, outer).statements)
    }

    /// Innermost block first
    fn chain(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.current).chain(self.outer.iter().rev())
    }

    fn block_mut(&mut self, depth: usize) -> &mut Block {
        if depth == 0 {
            &mut self.current
        } else {
            let index = self.outer.len() - depth;
            &mut self.outer[index]
        }
    }

    fn visible_local(&self, node: NodeId, through_barriers: bool) -> Option<String> {
        for block in self.chain() {
            if let Some(name) = block.locals.get(&node) {
                return Some(name.clone());
            }
            if block.kind.is_barrier() && !through_barriers {
                break;
            }
        }
        None
    }

    fn is_ensured(&self, node: NodeId) -> bool {
        self.chain().any(|b| b.ensured.contains(&node))
    }

    fn inside_initializer(&self) -> bool {
        self.chain()
            .find(|b| b.kind.is_barrier())
            .is_some_and(|b| b.kind == BlockKind::Initializer)
    }

    /// Depth of the block a shared local belongs to
    fn home_depth(&self, lifetime: Lifetime) -> usize {
        self.chain()
            .position(|b| match lifetime {
                Lifetime::PerResolve => b.kind.is_barrier(),
                _ => b.kind != BlockKind::Guard,
            })
            .unwrap_or(0)
    }

    fn edge_value(&mut self, edge: &InjectionEdge) -> StitchResult<Expr> {
        let to = edge.to.ok_or_else(|| {
            StitchError::Invariant(format!("unresolved injection {} reached the emitter", edge.injection))
        })?;
        if !edge.is_back_reference {
            return self.value(to);
        }

        let plan = self.plan;
        match plan.storage(to) {
            Some(Storage::Field { name }) => Ok(Expr::field(name.clone())),
            Some(Storage::Local) => self.visible_local(to, true).map(Expr::local).ok_or_else(|| {
                StitchError::Invariant(format!("back reference to node {} before its declaration", to))
            }),
            other => Err(unplanned(to, other)),
        }
    }

    fn value(&mut self, id: NodeId) -> StitchResult<Expr> {
        if let NodeKind::FuncArg { deferred, index } = self.graph.node(id).kind {
            return self
                .params
                .get(&(deferred, index))
                .map(|name| Expr::local(name.clone()))
                .ok_or_else(|| StitchError::Invariant(format!("factory parameter {} used outside its thunk", id)));
        }

        let plan = self.plan;
        match plan.storage(id) {
            Some(Storage::Arg { name }) => Ok(Expr::Arg { name: name.clone() }),
            Some(Storage::Field { name }) => self.field_value(id, name.clone()),
            Some(Storage::Local) => self.local_value(id),
            Some(Storage::Inline) => self.inline_value(id),
            None => Err(unplanned(id, None)),
        }
    }

    fn field_value(&mut self, id: NodeId, name: String) -> StitchResult<Expr> {
        if self.in_progress.contains(&id) || self.is_ensured(id) {
            return Ok(Expr::field(name));
        }

        self.in_progress.insert(id);
        self.push_block(BlockKind::Initializer);
        self.construct(id, Var::Field(name.clone()), false)?;
        let body = self.pop_block()?;
        self.in_progress.remove(&id);

        self.push(Statement::EnsureInitialized {
            target: Var::Field(name.clone()),
            lock: self.thread_safe,
            body,
        });
        self.current.ensured.insert(id);
        Ok(Expr::field(name))
    }

    fn local_value(&mut self, id: NodeId) -> StitchResult<Expr> {
        if let Some(name) = self.visible_local(id, false) {
            if self.hoisted.contains(&id) && !self.is_ensured(id) {
                self.guard(id, &name)?;
            }
            return Ok(Expr::local(name));
        }

        let graph = self.graph;
        let node = graph.node(id);
        let name = self.names.fresh(&node.ty);

        // Transient locals only exist to be captured by a cycle
        let depth = match node.lifetime {
            Lifetime::Transient => 0,
            lifetime => self.home_depth(lifetime),
        };
        if depth > 0 {
            debug!("Hoisting {} ({}) {} block(s) up", name, node.ty, depth);
            self.declare_in(depth, id, &name, node);
            self.hoisted.insert(id);
            self.guard(id, &name)?;
            return Ok(Expr::local(name));
        }

        if self.plan.declare_early(id) {
            self.push(Statement::DeclareLocal {
                name: name.clone(),
                ty: node.ty.clone(),
            });
            self.current.locals.insert(id, name.clone());
            self.construct(id, Var::Local(name.clone()), false)?;
        } else {
            self.construct(id, Var::Local(name.clone()), true)?;
            self.current.locals.insert(id, name.clone());
        }
        Ok(Expr::local(name))
    }

    /// Declare a local at the top of the block `depth` levels up
    fn declare_in(&mut self, depth: usize, id: NodeId, name: &str, node: &DependencyNode) {
        let home = self.block_mut(depth);
        home.statements.insert(
            home.hoisted,
            Statement::DeclareLocal {
                name: name.to_string(),
                ty: node.ty.clone(),
            },
        );
        home.hoisted += 1;
        home.locals.insert(id, name.to_string());
    }

    /// Initialize a hoisted local unless it already is
    fn guard(&mut self, id: NodeId, name: &str) -> StitchResult<()> {
        self.push_block(BlockKind::Guard);
        self.construct(id, Var::Local(name.to_string()), false)?;
        let body = self.pop_block()?;

        self.push(Statement::EnsureInitialized {
            target: Var::Local(name.to_string()),
            lock: false,
            body,
        });
        self.current.ensured.insert(id);
        Ok(())
    }

    fn inline_value(&mut self, id: NodeId) -> StitchResult<Expr> {
        let graph = self.graph;
        let node = graph.node(id);
        if let NodeKind::Deferred { .. } = node.kind {
            return Ok(Expr::Deferred(self.thunk(id)?));
        }

        let name = self.names.fresh(&node.ty);
        self.construct(id, Var::Local(name.clone()), true)?;
        Ok(Expr::local(name))
    }

    /// Emit the statements producing node `id` into `target`
    fn construct(&mut self, id: NodeId, target: Var, declare: bool) -> StitchResult<()> {
        if !self.constructing.insert(id) {
            return Err(StitchError::Invariant(format!("node {} is constructed recursively", id)));
        }

        let graph = self.graph;
        let node = graph.node(id);
        let edges: Vec<&InjectionEdge> = graph.outgoing(id).collect();

        let call = |kind: CallKind, args: Vec<Expr>| {
            Produced::Call(Call {
                kind,
                ty: node.ty.clone(),
                args,
            })
        };

        let mut members: &[&InjectionEdge] = &[];
        let produced = match &node.kind {
            NodeKind::Construct { plan, .. } => {
                if edges.len() < plan.parameters.len() {
                    return Err(StitchError::Invariant(format!("node {} is missing constructor arguments", id)));
                }
                let (params, rest) = edges.split_at(plan.parameters.len());
                members = rest;
                call(CallKind::Constructor, self.values(params)?)
            }
            NodeKind::Factory { expression, names, .. } => call(
                CallKind::Factory {
                    expression: expression.clone(),
                    names: names.clone(),
                },
                self.values(&edges)?,
            ),
            NodeKind::Collection { kind, element } => call(
                CallKind::Collection {
                    kind: *kind,
                    element: element.clone(),
                },
                self.values(&edges)?,
            ),
            NodeKind::Tuple => call(CallKind::Tuple, self.values(&edges)?),
            NodeKind::RootDelegate { root, .. } => call(CallKind::Root { name: root.clone() }, Vec::new()),
            NodeKind::Deferred { .. } => Produced::Value(Expr::Deferred(self.thunk(id)?)),
            NodeKind::Arg { .. } | NodeKind::FuncArg { .. } | NodeKind::Pending => {
                return Err(StitchError::Invariant(format!(
                    "node {} ({}) cannot be constructed",
                    id,
                    node.kind.label()
                )));
            }
        };

        if let (true, Var::Local(name)) = (declare, &target) {
            self.push(Statement::DeclareLocal {
                name: name.clone(),
                ty: node.ty.clone(),
            });
        }
        let statement = match produced {
            Produced::Call(call) => Statement::AssignFromCall {
                target: target.clone(),
                call,
            },
            Produced::Value(value) => Statement::Assign {
                target: target.clone(),
                value,
            },
        };
        self.push(statement);

        if let NodeKind::Construct { plan, .. } = &node.kind {
            let mut remaining = members;
            for member in &plan.members {
                let count = member.sites.len().min(remaining.len());
                let (sites, rest) = remaining.split_at(count);
                remaining = rest;
                let values = self.values(sites)?;
                self.push(Statement::AssignMember {
                    target: target.clone(),
                    member: member.name.clone(),
                    kind: member.kind,
                    values,
                });
            }
        }

        self.constructing.remove(&id);
        Ok(())
    }

    fn values(&mut self, edges: &[&InjectionEdge]) -> StitchResult<Vec<Expr>> {
        edges.iter().map(|edge| self.edge_value(edge)).collect()
    }

    fn thunk(&mut self, id: NodeId) -> StitchResult<Thunk> {
        let graph = self.graph;
        let NodeKind::Deferred { kind, args, .. } = &graph.node(id).kind else {
            return Err(StitchError::Invariant(format!("node {} is not a deferred wrapper", id)));
        };
        let edge = graph
            .outgoing(id)
            .next()
            .ok_or_else(|| StitchError::Invariant(format!("deferred node {} has no value", id)))?;

        let thread_safe = *kind == DeferredKind::Lazy && self.thread_safe && self.inside_initializer();
        let params = args
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                let name = self.names.fresh(ty);
                self.params.insert((id, index), name.clone());
                Param { name, ty: ty.clone() }
            })
            .collect();

        self.push_block(BlockKind::Thunk);
        let value = self.edge_value(edge)?;
        self.push(Statement::Return { value });
        let body = self.pop_block()?;

        Ok(Thunk {
            kind: *kind,
            thread_safe,
            params,
            body,
        })
    }
}
