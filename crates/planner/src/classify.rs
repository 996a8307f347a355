//! Structural classification of subdivisions

use lt_core::{AttributeIndex, Dimension, DimensionKind, NodeId, PartitionNode, PartitionTree};
use tracing::debug;

/// Handling strategy for one subdivision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCase {
    /// No children: item-id structure can be added directly
    Empty,
    /// Already split by item id; only missing keyed units are added
    AlreadyKeyed {
        /// Existing item-id catch-all, if any
        catch_all: Option<NodeId>,
    },
    /// Foreign-dimension units must be converted into subdivisions
    NeedsConversion {
        /// Positive foreign units, each becomes a subdivision
        convert: Vec<NodeId>,
        /// Children carried over unchanged
        keep: Vec<NodeId>,
    },
    /// Children are subdivisions; not a target
    Deeper,
    /// Only negative foreign units; nothing biddable to key
    Blocked,
}

impl TerminalCase {
    /// Whether the plan builder acts on this subdivision
    pub fn is_target(&self) -> bool {
        !matches!(self, TerminalCase::Deeper | TerminalCase::Blocked)
    }
}

/// Classify a single subdivision by its direct children
pub fn classify_subdivision(tree: &PartitionTree, id: NodeId) -> TerminalCase {
    let children: Vec<&PartitionNode> = tree.children(id).collect();

    if children.is_empty() {
        return TerminalCase::Empty;
    }

    // Only the deepest subdivisions are terminal
    if children.iter().any(|child| child.is_subdivision()) {
        return TerminalCase::Deeper;
    }

    if children.iter().any(|child| child.dimension.is_item_id()) {
        let catch_all = children
            .iter()
            .find(|child| child.dimension == Dimension::item_id_others())
            .map(|child| child.id);
        return TerminalCase::AlreadyKeyed { catch_all };
    }

    let (convert, keep): (Vec<&PartitionNode>, Vec<&PartitionNode>) =
        children.iter().partition(|child| child.is_biddable_unit());
    if convert.is_empty() {
        return TerminalCase::Blocked;
    }
    TerminalCase::NeedsConversion {
        convert: convert.iter().map(|node| node.id).collect(),
        keep: keep.iter().map(|node| node.id).collect(),
    }
}

/// Classification of every subdivision of a tree
#[derive(Debug, Clone, Default)]
pub struct Classification {
    cases: Vec<(NodeId, TerminalCase)>,
}

/// Classify every subdivision, in tree order
pub fn classify(tree: &PartitionTree) -> Classification {
    let cases = tree
        .subdivisions()
        .map(|node| {
            let case = classify_subdivision(tree, node.id);
            debug!(node = %node.id, dimension = %node.dimension, case = ?case, "classified subdivision");
            (node.id, case)
        })
        .collect();
    Classification { cases }
}

impl Classification {
    pub fn get(&self, id: NodeId) -> Option<&TerminalCase> {
        self.cases
            .iter()
            .find(|(node, _)| *node == id)
            .map(|(_, case)| case)
    }

    /// Subdivisions the plan builder acts on
    pub fn targets(&self) -> impl Iterator<Item = (NodeId, &TerminalCase)> {
        self.cases
            .iter()
            .filter(|(_, case)| case.is_target())
            .map(|(id, case)| (*id, case))
    }

    /// Subdivisions whose children need conversion
    pub fn conversions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cases
            .iter()
            .filter(|(_, case)| matches!(case, TerminalCase::NeedsConversion { .. }))
            .map(|(id, _)| *id)
    }

    /// Number of subdivisions left alone because nothing in them is biddable
    pub fn blocked(&self) -> usize {
        self.cases
            .iter()
            .filter(|(_, case)| matches!(case, TerminalCase::Blocked))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TerminalCase)> {
        self.cases.iter().map(|(id, case)| (*id, case))
    }
}

/// A unit whose structure must survive any rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedUnit {
    pub id: NodeId,
    /// Dimensions from below the root down to the unit itself
    pub path: Vec<Dimension>,
    pub negative: bool,
    pub bid_micros: Option<u64>,
}

/// Concrete foreign-dimension units anywhere in the tree
///
/// Units keyed by item id (the target dimension) or by the label slot (the
/// top-level selector) are excluded, as are catch-alls.
pub fn preserved_units(tree: &PartitionTree, label_index: AttributeIndex) -> Vec<PreservedUnit> {
    tree.iter()
        .filter(|node| node.is_unit())
        .filter(|node| match node.dimension.kind() {
            DimensionKind::CustomAttribute(index) => {
                index != label_index && !node.dimension.is_others()
            }
            DimensionKind::Root | DimensionKind::ItemId => false,
        })
        .map(|node| PreservedUnit {
            id: node.id,
            path: dimension_path(tree, node.id),
            negative: node.negative,
            bid_micros: node.bid_micros,
        })
        .collect()
}

/// Dimensions on the way from the root (exclusive) down to `id`
pub fn dimension_path(tree: &PartitionTree, id: NodeId) -> Vec<Dimension> {
    let mut path = Vec::new();
    let mut current = tree.get(id);
    while let Some(node) = current {
        if node.is_root() {
            break;
        }
        path.push(node.dimension.clone());
        current = node.parent.and_then(|parent| tree.get(parent));
    }
    path.reverse();
    path
}
