use crate::graph::NodeId;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a node's value lives in generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "storage")]
pub enum Storage {
    /// Persistent composition field, initialized at first reach
    Field { name: String },
    /// Read-only composition argument
    Arg { name: String },
    /// Block-local variable shared by every use of the node in the block
    Local,
    /// Produced afresh at every use
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePlan {
    pub storage: Storage,
    /// Declared before construction so a deferred value on its cycle can
    /// capture it
    pub declare_early: bool,
}

/// Storage decisions for every node reachable from a resolved root
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub(crate) nodes: BTreeMap<NodeId, NodePlan>,
    pub(crate) field_order: Vec<NodeId>,
    pub(crate) args: Vec<NodeId>,
    pub(crate) cycle_groups: Vec<Vec<NodeId>>,
}

impl Plan {
    pub fn node(&self, id: NodeId) -> Option<&NodePlan> {
        self.nodes.get(&id)
    }

    pub fn storage(&self, id: NodeId) -> Option<&Storage> {
        self.nodes.get(&id).map(|p| &p.storage)
    }

    pub fn declare_early(&self, id: NodeId) -> bool {
        self.nodes.get(&id).map(|p| p.declare_early).unwrap_or(false)
    }

    /// Persistent fields, dependencies before dependents
    pub fn field_order(&self) -> &[NodeId] {
        &self.field_order
    }

    /// Argument nodes in node order
    pub fn args(&self) -> &[NodeId] {
        &self.args
    }

    /// Strongly connected groups of more than one node (or a node
    /// referring to itself), lazy edges included
    pub fn cycle_groups(&self) -> &[Vec<NodeId>] {
        &self.cycle_groups
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
