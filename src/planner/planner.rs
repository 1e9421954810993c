use super::naming::Names;
use super::plan::{NodePlan, Plan, Storage};
use crate::core::{StitchError, StitchResult};
use crate::di::ConfigProvider;
use crate::graph::{DependencyGraph, DependencyNode, NodeId, NodeKind};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use stitch_core::{Diagnostic, DiagnosticId, DiagnosticSink, Injection, Lifetime};
use tracing::{debug, info, warn};

/// Assigns storage to every reachable node and checks lifetime capture
pub struct Planner<'a> {
    config: &'a dyn ConfigProvider,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a dyn ConfigProvider) -> Self {
        Self { config }
    }

    pub fn plan(&self, graph: &DependencyGraph, sink: &mut dyn DiagnosticSink) -> StitchResult<Plan> {
        let reachable = graph.reachable();
        info!("Planning storage for {} node(s)", reachable.len());

        // Edge weight: true when the edge orders construction
        let mut full: DiGraph<NodeId, bool> = DiGraph::new();
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
        for &node in &reachable {
            index.insert(node, full.add_node(node));
        }
        for &node in &reachable {
            for edge in graph.outgoing(node) {
                if let Some(to) = edge.to {
                    let ordering = !edge.is_lazy && !edge.is_back_reference;
                    full.add_edge(index[&node], index[&to], ordering);
                }
            }
        }

        let eager = full.filter_map(|_, &node| Some(node), |_, &ordering| ordering.then_some(()));
        let mut order = toposort(&eager, None).map_err(|cycle| {
            let node = eager[cycle.node_id()];
            StitchError::Invariant(format!(
                "Eager cycle through {} reached the planner",
                graph.node(node).ty
            ))
        })?;
        order.reverse();

        let cycle_groups = Self::cycle_groups(&full);
        let early = Self::declared_early(graph, &reachable, &cycle_groups);

        let mut nodes = BTreeMap::new();
        let mut args = Vec::new();
        let mut names = Names::with_prefix(self.config.field_prefix());
        let mut field_order = Vec::new();

        for idx in order {
            let id = eager[idx];
            let node = graph.node(id);
            let declare_early = early.contains(&id);
            let storage = match &node.kind {
                NodeKind::Arg { name, .. } => {
                    args.push(id);
                    Storage::Arg { name: name.clone() }
                }
                _ if node.lifetime.is_persistent() => {
                    field_order.push(id);
                    Storage::Field {
                        name: names.fresh(&node.ty),
                    }
                }
                _ if matches!(node.lifetime, Lifetime::PerResolve | Lifetime::PerBlock) => Storage::Local,
                _ if declare_early => Storage::Local,
                _ => Storage::Inline,
            };
            debug!("node {} ({}) stored as {:?}", id, node.ty, storage);
            nodes.insert(id, NodePlan { storage, declare_early });
        }
        args.sort_unstable();

        self.check_lifetimes(graph, &reachable, sink);

        Ok(Plan {
            nodes,
            field_order,
            args,
            cycle_groups,
        })
    }

    /// Strongly connected components that actually form a loop
    fn cycle_groups(full: &DiGraph<NodeId, bool>) -> Vec<Vec<NodeId>> {
        let mut groups: Vec<Vec<NodeId>> = tarjan_scc(full)
            .into_iter()
            .filter(|scc| scc.len() > 1 || full.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut group: Vec<NodeId> = scc.into_iter().map(|idx| full[idx]).collect();
                group.sort_unstable();
                group
            })
            .collect();
        groups.sort();
        groups
    }

    /// Back-reference targets inside their own cycle group
    fn declared_early(
        graph: &DependencyGraph,
        reachable: &BTreeSet<NodeId>,
        groups: &[Vec<NodeId>],
    ) -> HashSet<NodeId> {
        let group_of: HashMap<NodeId, usize> = groups
            .iter()
            .enumerate()
            .flat_map(|(g, members)| members.iter().map(move |&node| (node, g)))
            .collect();

        reachable
            .iter()
            .flat_map(|&node| graph.outgoing(node))
            .filter(|edge| edge.is_back_reference)
            .filter_map(|edge| {
                let to = edge.to?;
                let same_group = group_of.get(&edge.from).is_some_and(|g| group_of.get(&to) == Some(g));
                same_group.then_some(to)
            })
            .collect()
    }

    /// Report persistent nodes that capture a shorter-lived instance,
    /// directly or through transient intermediates
    fn check_lifetimes(
        &self,
        graph: &DependencyGraph,
        reachable: &BTreeSet<NodeId>,
        sink: &mut dyn DiagnosticSink,
    ) {
        let Some(severity) = self.config.lifetime_mismatch().severity() else {
            return;
        };

        for &id in reachable {
            let holder = graph.node(id);
            if !holder.lifetime.is_persistent() || matches!(holder.kind, NodeKind::Arg { .. }) {
                continue;
            }

            let mut reported = HashSet::new();
            let mut visited = HashSet::new();
            let mut path = Vec::new();
            let mut report = |captured: &DependencyNode, chain: &[Injection]| {
                if !reported.insert(captured.id) {
                    return;
                }
                let message = format!(
                    "{} {} captures {} {}",
                    holder.lifetime, holder.ty, captured.lifetime, captured.ty
                );
                warn!("{}", message);
                sink.report(
                    Diagnostic::new(DiagnosticId::LifetimeMismatch, severity, message)
                        .with_location(holder.location.clone())
                        .with_chain(chain.to_vec()),
                );
            };
            Self::find_captures(graph, holder, id, &mut path, &mut visited, &mut report);
        }
    }

    fn find_captures(
        graph: &DependencyGraph,
        holder: &DependencyNode,
        current: NodeId,
        path: &mut Vec<Injection>,
        visited: &mut HashSet<NodeId>,
        report: &mut dyn FnMut(&DependencyNode, &[Injection]),
    ) {
        if !visited.insert(current) {
            return;
        }

        for edge in graph.outgoing(current) {
            let Some(to) = edge.to else { continue };
            if edge.is_back_reference {
                continue;
            }
            let target = graph.node(to);
            path.push(edge.injection.clone());

            if matches!(target.kind, NodeKind::Arg { .. }) {
                // Arguments live as long as the composition
            } else if target.lifetime == Lifetime::Transient {
                Self::find_captures(graph, holder, to, path, visited, report);
            } else if target.lifetime.rank() < holder.lifetime.rank() {
                report(target, path);
            }

            path.pop();
        }
    }
}
