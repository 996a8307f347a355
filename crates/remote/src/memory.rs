//! In-memory partition service
//!
//! Enforces the same contract as the remote: batches are applied atomically,
//! removals cascade, placeholders resolve within a batch, and a batch that
//! would leave the tree structurally invalid is rejected as a whole.

use crate::error::{Failure, FailureKind, ServiceError};
use crate::service::{MutateOperation, MutateResult, PartitionService};
use ahash::AHashMap;
use async_trait::async_trait;
use lt_core::{validate, NodeId, NodeRecord, OwnerId, PartitionTree};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Serializable state of a [`MemoryService`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Next permanent id to hand out
    #[serde(default)]
    pub next_id: i64,
    #[serde(default)]
    pub owners: BTreeMap<OwnerId, Vec<NodeRecord>>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    owners: BTreeMap<OwnerId, Vec<NodeRecord>>,
    /// Batches still to fail with a concurrent-modification error
    transient_pending: usize,
    submissions: usize,
}

/// Partition service backed by process memory
#[derive(Debug, Default)]
pub struct MemoryService {
    state: Mutex<State>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let highest = snapshot
            .owners
            .values()
            .flatten()
            .map(|record| record.resource_id.get())
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(State {
                next_id: snapshot.next_id.max(highest + 1).max(1),
                owners: snapshot.owners,
                ..State::default()
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot {
            next_id: state.next_id,
            owners: state.owners.clone(),
        }
    }

    /// Put every owner's nodes back to an earlier snapshot
    pub fn restore(&self, snapshot: Snapshot) {
        let mut state = self.state.lock();
        state.next_id = snapshot.next_id;
        state.owners = snapshot.owners;
    }

    /// Replace an owner's nodes without any structural check
    pub fn seed(&self, owner: &OwnerId, records: Vec<NodeRecord>) {
        let mut state = self.state.lock();
        let highest = records
            .iter()
            .map(|record| record.resource_id.get())
            .max()
            .unwrap_or(0);
        state.next_id = state.next_id.max(highest + 1);
        state.owners.insert(owner.clone(), records);
    }

    /// Fail the next `count` batches with a concurrent-modification error
    pub fn inject_transient(&self, count: usize) {
        self.state.lock().transient_pending = count;
    }

    /// Number of `batch_mutate` calls received so far
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    pub fn records(&self, owner: &OwnerId) -> Vec<NodeRecord> {
        self.state
            .lock()
            .owners
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tree(&self, owner: &OwnerId) -> lt_core::Result<PartitionTree> {
        PartitionTree::from_records(self.records(owner))
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        self.state.lock().owners.keys().cloned().collect()
    }

    fn apply(
        state: &mut State,
        owner: &OwnerId,
        operations: &[MutateOperation],
    ) -> Result<Vec<MutateResult>, ServiceError> {
        let records = state.owners.get(owner).cloned().unwrap_or_default();
        let mut tree = PartitionTree::from_records(records)
            .map_err(|e| ServiceError::single(0, FailureKind::Other, e.to_string()))?;

        let mut next_id = state.next_id;
        let mut placeholders: AHashMap<NodeId, NodeId> = AHashMap::new();
        let mut results = Vec::with_capacity(operations.len());
        let mut failures = Vec::new();

        for (index, operation) in operations.iter().enumerate() {
            match operation {
                MutateOperation::Create(create) => {
                    if !create.id.is_placeholder() {
                        failures.push(Failure {
                            index,
                            kind: FailureKind::Other,
                            message: format!("create must use a placeholder id, got {}", create.id),
                        });
                        continue;
                    }

                    let parent = match create.parent {
                        Some(parent) if parent.is_placeholder() => match placeholders.get(&parent) {
                            Some(resolved) => Some(*resolved),
                            None => {
                                failures.push(Failure {
                                    index,
                                    kind: FailureKind::NotFound,
                                    message: format!("placeholder parent {} not in batch", parent),
                                });
                                continue;
                            }
                        },
                        other => other,
                    };

                    let id = NodeId::new(next_id);
                    next_id += 1;
                    match tree.insert(create.to_node(id, parent)) {
                        Ok(()) => {
                            placeholders.insert(create.id, id);
                            results.push(MutateResult { resource_id: id });
                        }
                        Err(e) => {
                            let kind = match e {
                                lt_core::Error::DanglingReference { .. } => FailureKind::NotFound,
                                _ => FailureKind::Other,
                            };
                            failures.push(Failure {
                                index,
                                kind,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                MutateOperation::Remove { resource_id } => {
                    if tree.contains(*resource_id) {
                        tree.remove_subtree(*resource_id);
                        results.push(MutateResult {
                            resource_id: *resource_id,
                        });
                    } else {
                        failures.push(Failure {
                            index,
                            kind: FailureKind::NotFound,
                            message: format!("resource {} not found", resource_id),
                        });
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Err(ServiceError::new(failures));
        }

        validate(&tree).map_err(|e| {
            ServiceError::single(
                operations.len().saturating_sub(1),
                FailureKind::Other,
                e.to_string(),
            )
        })?;

        state.next_id = next_id;
        state.owners.insert(owner.clone(), tree.to_records());
        Ok(results)
    }
}

#[async_trait]
impl PartitionService for MemoryService {
    async fn search(&self, owner: &OwnerId) -> Result<Vec<NodeRecord>, ServiceError> {
        Ok(self.records(owner))
    }

    async fn batch_mutate(
        &self,
        owner: &OwnerId,
        operations: &[MutateOperation],
    ) -> Result<Vec<MutateResult>, ServiceError> {
        let mut state = self.state.lock();
        state.submissions += 1;

        if state.transient_pending > 0 {
            state.transient_pending -= 1;
            debug!(owner = %owner, "injected concurrent modification");
            return Err(ServiceError::transient("concurrent modification"));
        }

        Self::apply(&mut state, owner, operations)
    }
}
