//! Arena representation of a materialized partition tree

use crate::error::{Error, Rule};
use crate::node::{NodeId, NodeRecord, PartitionNode};
use crate::Result;
use ahash::{AHashMap, AHashSet};
use std::fmt;

/// A partition tree keyed by node id
///
/// Nodes live in one map; parent/child links are ids into that map, so no
/// traversal chases owned pointers. Depth is memoized at insertion time
/// (root = 0).
#[derive(Debug, Clone, Default)]
pub struct PartitionTree {
    nodes: AHashMap<NodeId, PartitionNode>,
    /// Insertion order, kept for deterministic iteration
    order: Vec<NodeId>,
    depth: AHashMap<NodeId, u32>,
    root: Option<NodeId>,
}

impl PartitionTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from flat remote records
    ///
    /// Children keep the order in which records were returned. Fails with
    /// `DanglingReference` when a record names a parent that is absent and
    /// with `CycleDetected` when parent links never reach the root.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = NodeRecord>,
    {
        let mut tree = Self::new();

        for record in records {
            let node = PartitionNode::from_record(&record);
            if tree.nodes.contains_key(&node.id) {
                return Err(Error::DuplicateNode(node.id));
            }
            if node.parent.is_none() {
                if let Some(existing) = tree.root {
                    return Err(Error::violation(
                        node.id,
                        Rule::SingleRoot,
                        format!("second parentless node besides {}", existing),
                    ));
                }
                tree.root = Some(node.id);
            }
            tree.order.push(node.id);
            tree.nodes.insert(node.id, node);
        }

        // Link children
        for index in 0..tree.order.len() {
            let id = tree.order[index];
            let Some(parent) = tree.nodes[&id].parent else {
                continue;
            };
            match tree.nodes.get_mut(&parent) {
                Some(parent_node) => parent_node.children.push(id),
                None => return Err(Error::DanglingReference { node: id, parent }),
            }
        }

        tree.compute_depths()?;
        Ok(tree)
    }

    /// Memoized depth over parent links, walked iteratively
    fn compute_depths(&mut self) -> Result<()> {
        let mut chain = Vec::new();

        for &start in &self.order {
            if self.depth.contains_key(&start) {
                continue;
            }

            chain.clear();
            let mut on_chain = AHashSet::new();
            let mut current = start;
            let base = loop {
                if let Some(&known) = self.depth.get(&current) {
                    break Some(known);
                }
                if !on_chain.insert(current) {
                    return Err(Error::CycleDetected(start));
                }
                chain.push(current);
                match self.nodes[&current].parent {
                    Some(parent) => current = parent,
                    None => break None,
                }
            };

            // `chain` runs from `start` upwards; assign from the top down
            let mut depth = base.map_or(0, |d| d + 1);
            for &id in chain.iter().rev() {
                self.depth.insert(id, depth);
                depth += 1;
            }
        }

        Ok(())
    }

    /// Insert a node under an existing parent (or as root)
    pub fn insert(&mut self, node: PartitionNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }

        let depth = match node.parent {
            None => {
                if let Some(existing) = self.root {
                    return Err(Error::violation(
                        node.id,
                        Rule::SingleRoot,
                        format!("tree already rooted at {}", existing),
                    ));
                }
                self.root = Some(node.id);
                0
            }
            Some(parent) => {
                let parent_node = self
                    .nodes
                    .get_mut(&parent)
                    .ok_or(Error::DanglingReference {
                        node: node.id,
                        parent,
                    })?;
                parent_node.children.push(node.id);
                self.depth[&parent] + 1
            }
        };

        self.depth.insert(node.id, depth);
        self.order.push(node.id);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Remove a node and all of its descendants
    ///
    /// Returns the removed ids, subtree root first.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<NodeId> {
        let removed = self.descendants(id);
        if removed.is_empty() {
            return removed;
        }

        if let Some(parent) = self.nodes[&id].parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }

        let gone: AHashSet<NodeId> = removed.iter().copied().collect();
        for removed_id in &removed {
            self.nodes.remove(removed_id);
            self.depth.remove(removed_id);
        }
        self.order.retain(|id| !gone.contains(id));

        removed
    }

    /// The node and all nodes below it, in pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(&id) {
            return out;
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = &self.nodes[&current].children;
            stack.extend(children.iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`)
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.nodes.get(&node_id).and_then(|node| node.parent);
        }
        false
    }

    pub fn get(&self, id: NodeId) -> Option<&PartitionNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Children of a node, in insertion order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &PartitionNode> {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |child| &self.nodes[child])
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_node(&self) -> Option<&PartitionNode> {
        self.root.and_then(|id| self.nodes.get(&id))
    }

    /// Depth of a node (root = 0)
    pub fn depth(&self, id: NodeId) -> Option<u32> {
        self.depth.get(&id).copied()
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PartitionNode> {
        self.order.iter().map(move |id| &self.nodes[id])
    }

    /// Subdivisions in insertion order
    pub fn subdivisions(&self) -> impl Iterator<Item = &PartitionNode> {
        self.iter().filter(|node| node.is_subdivision())
    }

    /// Records in pre-order (parents before children)
    pub fn to_records(&self) -> Vec<NodeRecord> {
        match self.root {
            Some(root) => self
                .descendants(root)
                .into_iter()
                .map(|id| self.nodes[&id].to_record())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for PartitionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(root) = self.root else {
            return writeln!(f, "(empty tree)");
        };
        for id in self.descendants(root) {
            let depth = self.depth[&id] as usize;
            writeln!(f, "{}{}", "  ".repeat(depth), self.nodes[&id])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{AttributeIndex, Dimension};
    use crate::node::NodeKind;

    fn record(id: i64, parent: Option<i64>, kind: NodeKind, dimension: Dimension) -> NodeRecord {
        NodeRecord {
            resource_id: NodeId::new(id),
            kind,
            parent: parent.map(NodeId::new),
            dimension,
            negative: false,
            bid_micros: None,
        }
    }

    fn label_tree_records() -> Vec<NodeRecord> {
        let idx0 = AttributeIndex::new(0).unwrap();
        // Deliberately out of order: children before their parents
        vec![
            record(4, Some(3), NodeKind::Unit, Dimension::item_id_others()),
            record(3, Some(1), NodeKind::Subdivision, Dimension::custom_attribute(idx0, "a")),
            record(2, Some(1), NodeKind::Unit, Dimension::custom_attribute_others(idx0)),
            record(1, None, NodeKind::Subdivision, Dimension::Root),
        ]
    }

    #[test]
    fn test_materialize_depths() {
        let tree = PartitionTree::from_records(label_tree_records()).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root(), Some(NodeId::new(1)));
        assert_eq!(tree.depth(NodeId::new(1)), Some(0));
        assert_eq!(tree.depth(NodeId::new(2)), Some(1));
        assert_eq!(tree.depth(NodeId::new(3)), Some(1));
        assert_eq!(tree.depth(NodeId::new(4)), Some(2));

        let children: Vec<_> = tree.children(NodeId::new(1)).map(|n| n.id.get()).collect();
        assert_eq!(children, vec![3, 2]);
    }

    #[test]
    fn test_empty_records() {
        let tree = PartitionTree::from_records(Vec::new()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.to_string(), "(empty tree)\n");
    }

    #[test]
    fn test_dangling_parent() {
        let mut records = label_tree_records();
        records.push(record(9, Some(77), NodeKind::Unit, Dimension::item_id("x")));

        let err = PartitionTree::from_records(records).unwrap_err();
        assert_eq!(
            err,
            Error::DanglingReference {
                node: NodeId::new(9),
                parent: NodeId::new(77),
            }
        );
    }

    #[test]
    fn test_cycle_detected() {
        let records = vec![
            record(1, None, NodeKind::Subdivision, Dimension::Root),
            record(5, Some(6), NodeKind::Subdivision, Dimension::item_id("a")),
            record(6, Some(5), NodeKind::Subdivision, Dimension::item_id("b")),
        ];
        let err = PartitionTree::from_records(records).unwrap_err();
        assert!(matches!(err, Error::CycleDetected(_)));
    }

    #[test]
    fn test_second_root_rejected() {
        let records = vec![
            record(1, None, NodeKind::Subdivision, Dimension::Root),
            record(2, None, NodeKind::Subdivision, Dimension::Root),
        ];
        let err = PartitionTree::from_records(records).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::SingleRoot));
    }

    #[test]
    fn test_deep_chain_is_iterative() {
        let mut records = vec![record(1, None, NodeKind::Subdivision, Dimension::Root)];
        for id in 2..20_000 {
            records.push(record(id, Some(id - 1), NodeKind::Subdivision, Dimension::item_id("x")));
        }
        records.reverse();

        let tree = PartitionTree::from_records(records).unwrap();
        assert_eq!(tree.depth(NodeId::new(19_999)), Some(19_998));
    }

    #[test]
    fn test_remove_subtree() {
        let mut tree = PartitionTree::from_records(label_tree_records()).unwrap();

        let removed = tree.remove_subtree(NodeId::new(3));
        assert_eq!(removed, vec![NodeId::new(3), NodeId::new(4)]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(NodeId::new(1)).count(), 1);

        let removed = tree.remove_subtree(NodeId::new(1));
        assert_eq!(removed.len(), 2);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn test_insert_and_within() {
        let mut tree = PartitionTree::new();
        tree.insert(PartitionNode::root(NodeId::new(-1))).unwrap();
        tree.insert(PartitionNode::subdivision(
            NodeId::new(-2),
            Some(NodeId::new(-1)),
            Dimension::item_id("a"),
        ))
        .unwrap();

        assert_eq!(tree.depth(NodeId::new(-2)), Some(1));
        assert!(tree.is_within(NodeId::new(-2), NodeId::new(-1)));
        assert!(!tree.is_within(NodeId::new(-1), NodeId::new(-2)));

        let err = tree.insert(PartitionNode::root(NodeId::new(-3))).unwrap_err();
        assert_eq!(err.rule(), Some(Rule::SingleRoot));
    }

    #[test]
    fn test_outline() {
        let tree = PartitionTree::from_records(label_tree_records()).unwrap();
        let outline = tree.to_string();
        assert_eq!(
            outline,
            "SUBDIVISION ROOT\n  \
             SUBDIVISION Custom Attr 0: a\n    \
             UNIT [POSITIVE] Item ID: OTHERS\n  \
             UNIT [POSITIVE] Custom Attr 0: OTHERS\n"
        );
    }
}
