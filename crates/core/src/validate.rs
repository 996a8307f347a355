//! Structural validation of partition trees

use crate::error::{Error, Rule};
use crate::node::{NodeId, PartitionNode};
use crate::tree::PartitionTree;
use crate::Result;
use ahash::AHashSet;
use tracing::debug;

/// Check every structural rule the remote enforces
///
/// The empty tree is valid (nothing has been created yet). The first
/// violation found is returned, naming the offending node and rule.
pub fn validate(tree: &PartitionTree) -> Result<()> {
    if tree.is_empty() {
        return Ok(());
    }

    let root = tree.root_node().ok_or_else(|| {
        let first = tree.iter().next().map(|node| node.id);
        Error::violation(
            first.unwrap_or(NodeId::new(0)),
            Rule::SingleRoot,
            "no parentless node",
        )
    })?;

    if !root.is_subdivision() || !root.dimension.is_root() {
        return Err(Error::violation(
            root.id,
            Rule::RootShape,
            format!("root is {}", root),
        ));
    }

    for node in tree.iter() {
        check_node(tree, node)?;
    }

    debug!(nodes = tree.len(), "tree validated");
    Ok(())
}

fn check_node(tree: &PartitionTree, node: &PartitionNode) -> Result<()> {
    if !node.is_root() && node.dimension.is_root() {
        return Err(Error::violation(
            node.id,
            Rule::MisplacedRoot,
            "non-root node uses the root dimension",
        ));
    }

    if node.is_unit() {
        if !node.children.is_empty() {
            return Err(Error::violation(
                node.id,
                Rule::UnitHasChildren,
                format!("{} children", node.children.len()),
            ));
        }
        if node.negative && node.bid_micros.is_some() {
            return Err(Error::violation(
                node.id,
                Rule::NegativeWithBid,
                format!("bid {}", node.bid_micros.unwrap_or_default()),
            ));
        }
        return Ok(());
    }

    if node.negative || node.bid_micros.is_some() {
        return Err(Error::violation(
            node.id,
            Rule::SubdivisionPolarity,
            format!("{}", node),
        ));
    }

    if node.children.is_empty() {
        return Err(Error::violation(
            node.id,
            Rule::EmptySubdivision,
            "subdivision left without children",
        ));
    }

    let mut kind = None;
    let mut others = 0usize;
    let mut values = AHashSet::new();

    for child in tree.children(node.id) {
        let child_kind = child.dimension.kind();
        match kind {
            None => kind = Some(child_kind),
            Some(expected) if expected != child_kind => {
                return Err(Error::violation(
                    child.id,
                    Rule::SiblingDimension,
                    format!("{} next to {}", child_kind, expected),
                ));
            }
            Some(_) => {}
        }

        match child.dimension.value() {
            None => others += 1,
            Some(value) => {
                if !values.insert(value) {
                    return Err(Error::violation(
                        child.id,
                        Rule::DuplicateSibling,
                        format!("value {:?} repeated under {}", value, node.id),
                    ));
                }
            }
        }
    }

    if others != 1 {
        return Err(Error::violation(
            node.id,
            Rule::CatchAll,
            format!("{} OTHERS children", others),
        ));
    }

    Ok(())
}
