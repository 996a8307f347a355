//! Plans: the operation set realizing a target tree

use lt_core::{Dimension, NodeId, NodeKind, PartitionNode, PartitionTree};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which top-level operation requested the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Requested keys become positive biddable units; everything else is excluded
    Inclusive,
    /// Requested keys become negative units under each target
    Exclusive,
}

impl Mode {
    /// Polarity of the keyed units this mode creates
    pub fn keyed_negative(self) -> bool {
        matches!(self, Mode::Exclusive)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Inclusive => write!(f, "inclusive"),
            Mode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// Creation of one node, referencing its parent by permanent or placeholder id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOp {
    /// Placeholder id of the new node
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub dimension: Dimension,
    #[serde(default)]
    pub negative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_micros: Option<u64>,
}

impl CreateOp {
    pub fn from_node(node: &PartitionNode) -> Self {
        Self {
            id: node.id,
            parent: node.parent,
            kind: node.kind,
            dimension: node.dimension.clone(),
            negative: node.negative,
            bid_micros: node.bid_micros,
        }
    }

    /// Node this operation creates, under the given ids
    pub fn to_node(&self, id: NodeId, parent: Option<NodeId>) -> PartitionNode {
        let mut node = PartitionNode::subdivision(id, parent, self.dimension.clone());
        node.kind = self.kind;
        node.negative = self.negative;
        node.bid_micros = self.bid_micros;
        node
    }

    pub fn is_subdivision(&self) -> bool {
        self.kind == NodeKind::Subdivision
    }
}

impl fmt::Display for CreateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.to_node(self.id, self.parent);
        match self.parent {
            Some(parent) => write!(f, "create {} under {}: {}", self.id, parent, node),
            None => write!(f, "create {} as root: {}", self.id, node),
        }
    }
}

/// Caller-visible counts for one plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    /// Keys as requested, duplicates included
    pub requested: usize,
    /// Duplicate keys dropped before planning
    pub duplicates: usize,
    /// Keyed units created (summed over targets)
    pub added: usize,
    /// Keys already present with the requested polarity
    pub already_present: usize,
    /// Keys present with the opposite polarity, left untouched
    pub conflicting: usize,
    pub targets_extended: usize,
    pub targets_rebuilt: usize,
    /// Subdivisions with nothing biddable
    pub targets_skipped: usize,
    pub preserved: usize,
    pub removals: usize,
    pub creations: usize,
}

/// Removals and creations turning the materialized tree into `target`
#[derive(Debug, Clone)]
pub struct Plan {
    pub mode: Mode,
    /// Subtree roots to remove, deepest first; descendants are never listed
    pub removals: Vec<NodeId>,
    /// Creations in parent-first order
    pub creations: Vec<CreateOp>,
    /// Removed subtree root paired with the placeholder recreating it
    pub replacements: Vec<(NodeId, NodeId)>,
    /// Whether the removals include the current tree root
    pub replaces_root: bool,
    /// Tree after the plan is applied, new nodes under placeholder ids
    pub target: PartitionTree,
    pub report: PlanReport,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.creations.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.removals.len() + self.creations.len()
    }

    /// Placeholder whose creation recreates the removed node `removed`
    pub fn replacement_of(&self, removed: NodeId) -> Option<NodeId> {
        self.replacements
            .iter()
            .find(|(old, _)| *old == removed)
            .map(|(_, new)| *new)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "nothing to do");
        }
        for id in &self.removals {
            writeln!(f, "remove {}", id)?;
        }
        for op in &self.creations {
            writeln!(f, "{}", op)?;
        }
        Ok(())
    }
}
