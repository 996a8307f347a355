//! Mutation executor
//!
//! Submits a plan in as few batches as parent resolution allows:
//! - creations are grouped into atoms (a new subdivision together with the
//!   catch-all chain that keeps it valid) and packed parent-first
//! - placeholder parents created by earlier batches are rewritten to the
//!   permanent ids the remote returned
//! - a transient conflict resubmits the whole batch with exponential backoff
//! - a missing removal target is dropped from the batch and counted

use crate::config::ExecutorConfig;
use crate::error::{FailureKind, ServiceError, SyncError};
use crate::service::{MutateOperation, MutateResult, PartitionService};
use crate::Result;
use ahash::AHashMap;
use lt_core::{NodeId, OwnerId};
use planner::{CreateOp, Plan};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cancellation signal, honored only between batches
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the executor did for one plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Batches committed by the remote
    pub batches: usize,
    /// `batch_mutate` calls, retries included
    pub submissions: usize,
    pub created: usize,
    pub removed: usize,
    /// Removal targets the remote no longer had
    pub already_removed: usize,
    /// Delays slept before each retry
    pub backoffs: Vec<Duration>,
    /// Placeholder to permanent id, in creation order
    pub resolved: Vec<(NodeId, NodeId)>,
}

impl ExecutionReport {
    /// Permanent id assigned to a placeholder
    pub fn resolve(&self, placeholder: NodeId) -> Option<NodeId> {
        self.resolved
            .iter()
            .find(|(temp, _)| *temp == placeholder)
            .map(|(_, permanent)| *permanent)
    }
}

/// Submission order for one plan
#[derive(Debug, Default)]
struct BatchLayout {
    /// Sent alone, before everything else
    root_removal: Option<NodeId>,
    batches: Vec<Vec<MutateOperation>>,
}

impl BatchLayout {
    /// Pack removals and creation atoms into batches
    ///
    /// Each removal travels in the same batch as the atom recreating its
    /// replacement, so a removed catch-all is never missing between
    /// batches. Removals without a replacement open the first batch.
    fn from_plan(plan: &Plan, max_batch_ops: usize) -> Self {
        let max = max_batch_ops.max(1);
        let mut removals = plan.removals.clone();

        // Deepest first, so the root comes last
        let root_removal = if plan.replaces_root {
            removals.pop()
        } else {
            None
        };

        let mut paired: AHashMap<NodeId, Vec<NodeId>> = AHashMap::new();
        let mut unpaired = Vec::new();
        for removed in removals {
            match plan.replacement_of(removed) {
                Some(placeholder) => paired.entry(placeholder).or_default().push(removed),
                None => unpaired.push(removed),
            }
        }

        let mut batches = Vec::new();
        let mut current: Vec<MutateOperation> =
            unpaired.into_iter().map(MutateOperation::remove).collect();
        let mut has_creations = false;

        for atom in atoms(&plan.creations) {
            let leading = paired
                .remove(&plan.creations[atom[0]].id)
                .unwrap_or_default();
            let size = leading.len() + atom.len();
            if size > max {
                warn!(ops = size, max, "atom exceeds batch limit, submitting it alone");
            }
            if has_creations && current.len() + size > max {
                batches.push(std::mem::take(&mut current));
            }
            current.extend(leading.into_iter().map(MutateOperation::remove));
            current.extend(
                atom.into_iter()
                    .map(|index| MutateOperation::Create(plan.creations[index].clone())),
            );
            has_creations = true;
        }
        if !current.is_empty() {
            batches.push(current);
        }

        // Replacement not among the creations
        let stray: Vec<MutateOperation> = paired
            .into_values()
            .flatten()
            .map(MutateOperation::remove)
            .collect();
        if !stray.is_empty() {
            batches.insert(0, stray);
        }

        Self {
            root_removal,
            batches,
        }
    }
}

/// Group creations into atoms, in parent-first order
///
/// An atom is a creation plus, for a subdivision, its catch-all child and
/// that child's own catch-all chain. Each atom leaves the tree valid.
fn atoms(creations: &[CreateOp]) -> Vec<Vec<usize>> {
    let catch_all_of: AHashMap<NodeId, usize> = creations
        .iter()
        .enumerate()
        .filter(|(_, op)| op.dimension.is_others())
        .filter_map(|(index, op)| op.parent.map(|parent| (parent, index)))
        .collect();

    let mut taken = vec![false; creations.len()];
    let mut atoms = Vec::new();

    for start in 0..creations.len() {
        if taken[start] {
            continue;
        }
        taken[start] = true;
        let mut atom = vec![start];

        let mut current = start;
        while creations[current].is_subdivision() {
            match catch_all_of.get(&creations[current].id) {
                Some(&child) if !taken[child] => {
                    taken[child] = true;
                    atom.push(child);
                    current = child;
                }
                _ => break,
            }
        }
        atoms.push(atom);
    }

    atoms
}

/// Indices of removals the remote reported as already gone
fn missing_removals(err: &ServiceError, operations: &[MutateOperation]) -> Vec<usize> {
    err.failures
        .iter()
        .filter(|failure| failure.kind == FailureKind::NotFound)
        .filter(|failure| {
            operations
                .get(failure.index)
                .is_some_and(MutateOperation::is_remove)
        })
        .map(|failure| failure.index)
        .collect()
}

/// Submits plans to a partition service
pub struct Executor<'a, S: ?Sized> {
    service: &'a S,
    config: &'a ExecutorConfig,
    cancel: CancelFlag,
}

impl<'a, S: PartitionService + ?Sized> Executor<'a, S> {
    pub fn new(service: &'a S, config: &'a ExecutorConfig) -> Self {
        Self {
            service,
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply a plan
    ///
    /// Batches are submitted strictly in order; each one depends on the ids
    /// returned for the previous one.
    pub async fn execute(&self, owner: &OwnerId, plan: &Plan) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();
        let mut resolved: AHashMap<NodeId, NodeId> = AHashMap::new();
        let layout = BatchLayout::from_plan(plan, self.config.max_batch_ops);

        if let Some(root) = layout.root_removal {
            self.check_cancelled()?;
            debug!(owner = %owner, root = %root, "removing tree root");
            let (sent, results) = self
                .submit(owner, vec![MutateOperation::remove(root)], &mut report)
                .await?;
            record(&sent, &results, &mut report, &mut resolved);
            tokio::time::sleep(self.config.removal_settle_delay()).await;
        }

        let total = layout.batches.len();
        for (index, mut batch) in layout.batches.into_iter().enumerate() {
            self.check_cancelled()?;

            for operation in batch.iter_mut() {
                if let MutateOperation::Create(create) = operation {
                    if let Some(permanent) = create.parent.and_then(|p| resolved.get(&p)) {
                        create.parent = Some(*permanent);
                    }
                }
            }

            debug!(
                owner = %owner,
                batch = index + 1,
                of = total,
                ops = batch.len(),
                "submitting batch"
            );
            let (sent, results) = self.submit(owner, batch, &mut report).await?;
            record(&sent, &results, &mut report, &mut resolved);

            if index + 1 < total {
                tokio::time::sleep(self.config.settle_delay()).await;
            }
        }

        info!(
            owner = %owner,
            batches = report.batches,
            submissions = report.submissions,
            created = report.created,
            removed = report.removed,
            "plan executed"
        );
        Ok(report)
    }

    /// Remove a whole tree by its root
    ///
    /// Returns `false` when the remote no longer had the root.
    pub async fn remove_root(&self, owner: &OwnerId, root: NodeId) -> Result<bool> {
        self.check_cancelled()?;
        let mut report = ExecutionReport::default();
        let (sent, _) = self
            .submit(owner, vec![MutateOperation::remove(root)], &mut report)
            .await?;
        Ok(!sent.is_empty())
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            warn!("cancellation requested, stopping before next batch");
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Submit one batch until it commits
    ///
    /// Returns the operations actually committed (missing removals dropped)
    /// with their results.
    async fn submit(
        &self,
        owner: &OwnerId,
        mut operations: Vec<MutateOperation>,
        report: &mut ExecutionReport,
    ) -> Result<(Vec<MutateOperation>, Vec<MutateResult>)> {
        let mut attempt: u32 = 0;

        loop {
            if operations.is_empty() {
                return Ok((operations, Vec::new()));
            }

            attempt += 1;
            report.submissions += 1;

            let err = match self.service.batch_mutate(owner, &operations).await {
                Ok(results) => {
                    if results.len() != operations.len() {
                        return Err(SyncError::RemoteRejected {
                            index: results.len().min(operations.len()),
                            message: format!(
                                "expected {} results, got {}",
                                operations.len(),
                                results.len()
                            ),
                        });
                    }
                    report.batches += 1;
                    return Ok((operations, results));
                }
                Err(err) => err,
            };

            let gone = missing_removals(&err, &operations);
            if !gone.is_empty() && gone.len() == err.failures.len() {
                // Not an attempt: the batch itself was fine
                attempt -= 1;
                report.already_removed += gone.len();
                debug!(owner = %owner, count = gone.len(), "removal targets already gone");
                let mut index = 0;
                operations.retain(|_| {
                    let keep = !gone.contains(&index);
                    index += 1;
                    keep
                });
                continue;
            }

            if err.is_transient() {
                if attempt >= self.config.max_attempts {
                    warn!(owner = %owner, attempts = attempt, "retry ceiling reached");
                    return Err(SyncError::ReconciliationFailed {
                        attempts: attempt,
                        last: err,
                    });
                }
                let delay = self.config.backoff(attempt);
                warn!(
                    owner = %owner,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "concurrent modification, retrying batch"
                );
                report.backoffs.push(delay);
                tokio::time::sleep(delay).await;
                continue;
            }

            let failure = err
                .failures
                .iter()
                .find(|failure| !gone.contains(&failure.index))
                .or_else(|| err.failures.first());
            return Err(match failure {
                Some(failure) => SyncError::RemoteRejected {
                    index: failure.index,
                    message: failure.message.clone(),
                },
                None => SyncError::RemoteRejected {
                    index: 0,
                    message: err.to_string(),
                },
            });
        }
    }
}

fn record(
    sent: &[MutateOperation],
    results: &[MutateResult],
    report: &mut ExecutionReport,
    resolved: &mut AHashMap<NodeId, NodeId>,
) {
    for (operation, result) in sent.iter().zip(results) {
        match operation {
            MutateOperation::Create(create) => {
                resolved.insert(create.id, result.resource_id);
                report.resolved.push((create.id, result.resource_id));
                report.created += 1;
            }
            MutateOperation::Remove { .. } => report.removed += 1,
        }
    }
}
