//! Plan building
//!
//! The target tree is built in memory from the materialized tree:
//! - targets outside any rebuild are extended in place (incremental)
//! - the parent of every subdivision needing conversion is removed and
//!   recreated node by node, transforming the targets inside it
//!
//! The diff is then read straight off the target tree: every node carrying a
//! placeholder id is a creation, every rebuild root is a removal.

use crate::classify::{
    classify, dimension_path, preserved_units, Classification, PreservedUnit, TerminalCase,
};
use crate::config::PlannerConfig;
use crate::plan::{CreateOp, Mode, Plan, PlanReport};
use ahash::AHashMap;
use lt_core::{
    validate, Dimension, Error, IdAllocator, NodeId, PartitionNode, PartitionTree, RequestedKeys,
    Result, Rule,
};
use std::cmp::Reverse;
use tracing::{debug, warn};

/// Builds plans for both reconciliation modes
pub struct Planner<'a> {
    config: &'a PlannerConfig,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        Self { config }
    }

    /// Exclude `keys` from every terminal subdivision
    ///
    /// An empty tree is bootstrapped with the standard layout for `label`.
    pub fn plan_exclusive(
        &self,
        tree: &PartitionTree,
        label: &str,
        keys: &RequestedKeys,
        ids: &mut IdAllocator,
    ) -> Result<Plan> {
        let mut builder = Builder::new(self.config, Mode::Exclusive, keys, ids);

        if tree.is_empty() {
            builder.bootstrap_labelled(label)?;
            return builder.finish(Vec::new(), false, &[]);
        }

        let classification = classify(tree);
        let preserved = preserved_units(tree, self.config.label_index);
        let roots = rebuild_roots(tree, &classification);

        builder.target = tree.clone();
        for &root in &roots {
            debug!(root = %root, "rebuilding subtree");
            builder.rebuild(tree, root, &classification)?;
        }

        for (id, case) in classification.targets() {
            if roots.iter().any(|root| tree.is_within(id, *root)) {
                continue;
            }
            match case {
                TerminalCase::Empty | TerminalCase::AlreadyKeyed { .. } => {
                    if builder.fill(id, self.config.default_bid_micros)? {
                        builder.report.targets_extended += 1;
                    }
                }
                // Always inside a rebuild root
                TerminalCase::NeedsConversion { .. } => {}
                TerminalCase::Deeper | TerminalCase::Blocked => {}
            }
        }

        builder.report.targets_skipped = classification.blocked();
        builder.report.preserved = preserved.len();

        let replaces_root = tree.root().is_some_and(|root| roots.contains(&root));
        let removals = order_removals(tree, roots);
        builder.finish(removals, replaces_root, &preserved)
    }

    /// Restrict the tree to `keys`: positive units for the keys, everything
    /// else excluded by a negative item-id catch-all under the root
    pub fn plan_inclusive(
        &self,
        tree: &PartitionTree,
        keys: &RequestedKeys,
        ids: &mut IdAllocator,
    ) -> Result<Plan> {
        let mut builder = Builder::new(self.config, Mode::Inclusive, keys, ids);

        let Some(root) = tree.root_node() else {
            builder.bootstrap_inclusive()?;
            return builder.finish(Vec::new(), false, &[]);
        };

        let extendable = tree.children(root.id).all(|child| {
            child.is_unit()
                && child.dimension.is_item_id()
                && (!child.dimension.is_others() || child.negative)
        });

        if extendable {
            builder.target = tree.clone();
            if builder.fill(root.id, self.config.default_bid_micros)? {
                builder.report.targets_extended += 1;
            }
            builder.finish(Vec::new(), false, &[])
        } else {
            debug!(root = %root.id, "replacing whole tree");
            builder.bootstrap_inclusive()?;
            if let Some(new_root) = builder.target.root() {
                builder.replacements.push((root.id, new_root));
            }
            builder.finish(vec![root.id], true, &[])
        }
    }
}

/// Step of the iterative subtree copy
enum Task {
    Copy { old: NodeId, parent: Option<NodeId> },
    Convert { old: NodeId, parent: NodeId },
    Fill(NodeId),
}

struct Builder<'a> {
    config: &'a PlannerConfig,
    mode: Mode,
    keys: &'a RequestedKeys,
    ids: &'a mut IdAllocator,
    target: PartitionTree,
    replacements: Vec<(NodeId, NodeId)>,
    report: PlanReport,
}

impl<'a> Builder<'a> {
    fn new(
        config: &'a PlannerConfig,
        mode: Mode,
        keys: &'a RequestedKeys,
        ids: &'a mut IdAllocator,
    ) -> Self {
        let report = PlanReport {
            requested: keys.requested(),
            duplicates: keys.duplicates(),
            ..PlanReport::default()
        };
        Self {
            config,
            mode,
            keys,
            ids,
            target: PartitionTree::new(),
            replacements: Vec::new(),
            report,
        }
    }

    fn catch_all(&mut self, parent: NodeId, bid_micros: u64) -> PartitionNode {
        let id = self.ids.next_id();
        match self.mode {
            Mode::Exclusive => {
                PartitionNode::biddable(id, parent, Dimension::item_id_others(), bid_micros)
            }
            Mode::Inclusive => PartitionNode::excluded(id, parent, Dimension::item_id_others()),
        }
    }

    fn keyed(&mut self, parent: NodeId, key: &str) -> PartitionNode {
        let id = self.ids.next_id();
        match self.mode {
            Mode::Exclusive => PartitionNode::excluded(id, parent, Dimension::item_id(key)),
            Mode::Inclusive => PartitionNode::biddable(
                id,
                parent,
                Dimension::item_id(key),
                self.config.default_bid_micros,
            ),
        }
    }

    /// Add the item-id catch-all (if missing) and every missing key
    ///
    /// Returns whether anything was added.
    fn fill(&mut self, subdivision: NodeId, catch_all_bid: u64) -> Result<bool> {
        let mut existing = AHashMap::new();
        let mut has_catch_all = false;
        for child in self.target.children(subdivision) {
            if !child.dimension.is_item_id() {
                continue;
            }
            match child.dimension.value() {
                None => has_catch_all = true,
                Some(value) => {
                    existing.insert(value.to_string(), child.negative);
                }
            }
        }

        let mut changed = false;
        if !has_catch_all {
            let node = self.catch_all(subdivision, catch_all_bid);
            self.target.insert(node)?;
            changed = true;
        }

        let keys = self.keys;
        for key in keys.iter() {
            match existing.get(key) {
                Some(&negative) if negative == self.mode.keyed_negative() => {
                    self.report.already_present += 1;
                }
                Some(_) => {
                    self.report.conflicting += 1;
                    warn!(
                        key,
                        subdivision = %subdivision,
                        mode = %self.mode,
                        "key present with opposite polarity, left unchanged"
                    );
                }
                None => {
                    let node = self.keyed(subdivision, key);
                    self.target.insert(node)?;
                    self.report.added += 1;
                    changed = true;
                }
            }
        }

        Ok(changed)
    }

    /// Turn a positive foreign unit into a subdivision keyed by item id
    ///
    /// The unit's bid moves onto the new catch-all.
    fn convert(&mut self, unit: &PartitionNode, parent: NodeId) -> Result<()> {
        let id = self.ids.next_id();
        self.target.insert(PartitionNode::subdivision(
            id,
            Some(parent),
            unit.dimension.clone(),
        ))?;
        let bid = unit.bid_micros.unwrap_or(self.config.default_bid_micros);
        self.fill(id, bid)?;
        Ok(())
    }

    /// Replace the subtree at `root` with a transformed copy
    fn rebuild(
        &mut self,
        source: &PartitionTree,
        root: NodeId,
        classification: &Classification,
    ) -> Result<()> {
        let parent = source.get(root).and_then(|node| node.parent);
        self.target.remove_subtree(root);

        let mut stack = vec![Task::Copy { old: root, parent }];
        while let Some(task) = stack.pop() {
            match task {
                Task::Copy { old, parent } => {
                    let Some(node) = source.get(old) else {
                        continue;
                    };
                    let id = self.ids.next_id();
                    let mut copy = node.clone();
                    copy.id = id;
                    copy.parent = parent;
                    copy.children.clear();
                    self.target.insert(copy)?;
                    if old == root {
                        self.replacements.push((root, id));
                    }

                    match classification.get(old) {
                        Some(TerminalCase::NeedsConversion { convert, .. }) => {
                            self.report.targets_rebuilt += 1;
                            for child in node.children.iter().rev() {
                                if convert.contains(child) {
                                    stack.push(Task::Convert {
                                        old: *child,
                                        parent: id,
                                    });
                                } else {
                                    stack.push(Task::Copy {
                                        old: *child,
                                        parent: Some(id),
                                    });
                                }
                            }
                        }
                        Some(TerminalCase::Empty | TerminalCase::AlreadyKeyed { .. }) => {
                            // Runs after the children below are copied
                            stack.push(Task::Fill(id));
                            push_copies(&mut stack, node, id);
                        }
                        _ => push_copies(&mut stack, node, id),
                    }
                }
                Task::Convert { old, parent } => {
                    if let Some(unit) = source.get(old) {
                        self.convert(unit, parent)?;
                    }
                }
                Task::Fill(id) => {
                    if self.fill(id, self.config.default_bid_micros)? {
                        self.report.targets_extended += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Standard layout for an owner without any nodes
    ///
    /// root -> [label OTHERS (negative), label -> [structure OTHERS -> keyed,
    /// bootstrap exclusions (negative)]]
    fn bootstrap_labelled(&mut self, label: &str) -> Result<()> {
        let label_index = self.config.label_index;
        let structure_index = self.config.structure_index();

        let root = self.ids.next_id();
        self.target.insert(PartitionNode::root(root))?;

        let label_others = self.ids.next_id();
        self.target.insert(PartitionNode::excluded(
            label_others,
            root,
            Dimension::custom_attribute_others(label_index),
        ))?;

        let label_node = self.ids.next_id();
        self.target.insert(PartitionNode::subdivision(
            label_node,
            Some(root),
            Dimension::custom_attribute(label_index, label),
        ))?;

        let structure = self.ids.next_id();
        self.target.insert(PartitionNode::subdivision(
            structure,
            Some(label_node),
            Dimension::custom_attribute_others(structure_index),
        ))?;
        self.fill(structure, self.config.default_bid_micros)?;

        let config = self.config;
        for exclusion in &config.bootstrap_exclusions {
            let id = self.ids.next_id();
            self.target.insert(PartitionNode::excluded(
                id,
                label_node,
                Dimension::custom_attribute(exclusion.index, exclusion.value.as_str()),
            ))?;
        }

        self.report.targets_rebuilt += 1;
        Ok(())
    }

    /// root -> [item-id OTHERS (negative), one positive unit per key]
    fn bootstrap_inclusive(&mut self) -> Result<()> {
        self.target = PartitionTree::new();
        let root = self.ids.next_id();
        self.target.insert(PartitionNode::root(root))?;
        self.fill(root, self.config.default_bid_micros)?;
        self.report.targets_rebuilt += 1;
        Ok(())
    }

    fn finish(
        mut self,
        removals: Vec<NodeId>,
        replaces_root: bool,
        preserved: &[PreservedUnit],
    ) -> Result<Plan> {
        validate(&self.target)?;
        verify_preserved(&self.target, preserved, self.config.default_bid_micros)?;

        let creations: Vec<CreateOp> = match self.target.root() {
            Some(root) => self
                .target
                .descendants(root)
                .into_iter()
                .filter(|id| id.is_placeholder())
                .filter_map(|id| self.target.get(id))
                .map(CreateOp::from_node)
                .collect(),
            None => Vec::new(),
        };

        self.report.removals = removals.len();
        self.report.creations = creations.len();

        Ok(Plan {
            mode: self.mode,
            removals,
            creations,
            replacements: self.replacements,
            replaces_root,
            target: self.target,
            report: self.report,
        })
    }
}

fn push_copies(stack: &mut Vec<Task>, node: &PartitionNode, parent: NodeId) {
    for child in node.children.iter().rev() {
        stack.push(Task::Copy {
            old: *child,
            parent: Some(parent),
        });
    }
}

/// Parents of subdivisions needing conversion, outermost only
fn rebuild_roots(tree: &PartitionTree, classification: &Classification) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = Vec::new();
    for target in classification.conversions() {
        let root = tree
            .get(target)
            .and_then(|node| node.parent)
            .unwrap_or(target);
        if !roots.contains(&root) {
            roots.push(root);
        }
    }

    roots
        .iter()
        .copied()
        .filter(|root| {
            !roots
                .iter()
                .any(|other| other != root && tree.is_within(*root, *other))
        })
        .collect()
}

/// Deepest first; none is a descendant of another
fn order_removals(tree: &PartitionTree, mut roots: Vec<NodeId>) -> Vec<NodeId> {
    roots.sort_by_key(|id| Reverse(tree.depth(*id).unwrap_or(0)));
    roots
}

/// Every preserved unit survives as itself, or (when positive) as a
/// subdivision of the same dimension whose catch-all carries its bid
fn verify_preserved(
    target: &PartitionTree,
    preserved: &[PreservedUnit],
    default_bid: u64,
) -> Result<()> {
    if preserved.is_empty() {
        return Ok(());
    }

    let by_path: AHashMap<Vec<Dimension>, NodeId> = target
        .iter()
        .map(|node| (dimension_path(target, node.id), node.id))
        .collect();

    for unit in preserved {
        let survivor = by_path.get(&unit.path).and_then(|id| target.get(*id));
        let intact = match survivor {
            Some(node) if node.is_unit() => {
                node.negative == unit.negative && node.bid_micros == unit.bid_micros
            }
            Some(node) if !unit.negative => {
                let bid = unit.bid_micros.unwrap_or(default_bid);
                target.children(node.id).any(|child| {
                    child.dimension == Dimension::item_id_others() && child.bid_micros == Some(bid)
                })
            }
            _ => false,
        };

        if !intact {
            let path: Vec<String> = unit.path.iter().map(ToString::to_string).collect();
            return Err(Error::violation(
                unit.id,
                Rule::PreservationLost,
                path.join(" > "),
            ));
        }
    }

    Ok(())
}
