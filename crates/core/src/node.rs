//! Partition node representation

use crate::dimension::Dimension;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Identifier of a partition node
///
/// Negative values are placeholders handed out by [`crate::IdAllocator`]
/// for nodes the remote has not created yet. Positive values are permanent
/// ids assigned by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Whether this id still awaits a permanent one from the remote
    pub fn is_placeholder(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning entity of a partition tree (an ad group resource)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of partition node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Branch node, splits its inherited items further
    Subdivision,
    /// Terminal node, biddable or excluding
    Unit,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Subdivision => write!(f, "SUBDIVISION"),
            NodeKind::Unit => write!(f, "UNIT"),
        }
    }
}

/// Flat node record as returned by the remote search operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub resource_id: NodeId,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    pub dimension: Dimension,
    #[serde(default)]
    pub negative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid_micros: Option<u64>,
}

/// One element of a partition tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Owning subdivision, `None` only for the root
    pub parent: Option<NodeId>,
    pub dimension: Dimension,
    /// Excludes matching items instead of bidding on them
    pub negative: bool,
    pub bid_micros: Option<u64>,
    /// Child ids in insertion order
    pub children: SmallVec<[NodeId; 4]>,
}

impl PartitionNode {
    /// Tree root
    pub fn root(id: NodeId) -> Self {
        Self::subdivision(id, None, Dimension::Root)
    }

    /// Branch node
    pub fn subdivision(id: NodeId, parent: Option<NodeId>, dimension: Dimension) -> Self {
        Self {
            id,
            kind: NodeKind::Subdivision,
            parent,
            dimension,
            negative: false,
            bid_micros: None,
            children: SmallVec::new(),
        }
    }

    /// Positive unit carrying a bid
    pub fn biddable(id: NodeId, parent: NodeId, dimension: Dimension, bid_micros: u64) -> Self {
        Self {
            id,
            kind: NodeKind::Unit,
            parent: Some(parent),
            dimension,
            negative: false,
            bid_micros: Some(bid_micros),
            children: SmallVec::new(),
        }
    }

    /// Excluding unit, never carries a bid
    pub fn excluded(id: NodeId, parent: NodeId, dimension: Dimension) -> Self {
        Self {
            id,
            kind: NodeKind::Unit,
            parent: Some(parent),
            dimension,
            negative: true,
            bid_micros: None,
            children: SmallVec::new(),
        }
    }

    pub fn from_record(record: &NodeRecord) -> Self {
        Self {
            id: record.resource_id,
            kind: record.kind,
            parent: record.parent,
            dimension: record.dimension.clone(),
            negative: record.negative,
            bid_micros: record.bid_micros,
            children: SmallVec::new(),
        }
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            resource_id: self.id,
            kind: self.kind,
            parent: self.parent,
            dimension: self.dimension.clone(),
            negative: self.negative,
            bid_micros: self.bid_micros,
        }
    }

    pub fn is_subdivision(&self) -> bool {
        self.kind == NodeKind::Subdivision
    }

    pub fn is_unit(&self) -> bool {
        self.kind == NodeKind::Unit
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Positive unit, i.e. one that routes items into bidding
    pub fn is_biddable_unit(&self) -> bool {
        self.is_unit() && !self.negative
    }

    /// Same kind, dimension, polarity and bid, ignoring ids and links
    pub fn same_shape(&self, other: &PartitionNode) -> bool {
        self.kind == other.kind
            && self.dimension == other.dimension
            && self.negative == other.negative
            && self.bid_micros == other.bid_micros
    }
}

impl fmt::Display for PartitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let polarity = if self.is_unit() {
            if self.negative {
                " [NEGATIVE]"
            } else {
                " [POSITIVE]"
            }
        } else {
            ""
        };
        write!(f, "{}{} {}", self.kind, polarity, self.dimension)?;
        if let Some(bid) = self.bid_micros {
            write!(f, " (bid {})", bid)?;
        }
        Ok(())
    }
}
