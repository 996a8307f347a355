//! Tree errors

use crate::node::NodeId;
use std::fmt;
use thiserror::Error;

/// Structural rule a tree can break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Exactly one parentless node
    SingleRoot,
    /// Root is a SUBDIVISION with the root dimension
    RootShape,
    /// Only the root carries the root dimension
    MisplacedRoot,
    /// Siblings share one dimension type
    SiblingDimension,
    /// A subdivision has exactly one OTHERS child
    CatchAll,
    /// A subdivision has at least one child
    EmptySubdivision,
    /// Units are leaves
    UnitHasChildren,
    /// Negative units carry no bid
    NegativeWithBid,
    /// Subdivisions are neither negative nor biddable
    SubdivisionPolarity,
    /// Concrete sibling values are unique
    DuplicateSibling,
    /// A preserved unit is missing from a planned tree
    PreservationLost,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rule::SingleRoot => "tree must have exactly one root",
            Rule::RootShape => "root must be a SUBDIVISION without dimension",
            Rule::MisplacedRoot => "only the root may use the root dimension",
            Rule::SiblingDimension => "siblings must share one dimension type",
            Rule::CatchAll => "subdivision needs exactly one OTHERS child",
            Rule::EmptySubdivision => "subdivision has no children",
            Rule::UnitHasChildren => "unit cannot have children",
            Rule::NegativeWithBid => "negative unit cannot carry a bid",
            Rule::SubdivisionPolarity => "subdivision cannot be negative or biddable",
            Rule::DuplicateSibling => "sibling values must be unique",
            Rule::PreservationLost => "preserved unit missing after rebuild",
        };
        f.write_str(text)
    }
}

/// Errors raised while materializing, validating or planning a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An invariant would be broken; the pass aborts before any mutation
    #[error("structural violation at node {node}: {rule} ({detail})")]
    StructuralViolation {
        node: NodeId,
        rule: Rule,
        detail: String,
    },

    /// Malformed remote read: a node names a parent that was not returned
    #[error("node {node} references missing parent {parent}")]
    DanglingReference { node: NodeId, parent: NodeId },

    #[error("node {0} appears more than once")]
    DuplicateNode(NodeId),

    #[error("parent chain of node {0} loops back on itself")]
    CycleDetected(NodeId),
}

impl Error {
    pub fn violation(node: NodeId, rule: Rule, detail: impl Into<String>) -> Self {
        Error::StructuralViolation {
            node,
            rule,
            detail: detail.into(),
        }
    }

    /// Rule broken, for structural violations
    pub fn rule(&self) -> Option<Rule> {
        match self {
            Error::StructuralViolation { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}
