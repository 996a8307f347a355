//! Reconciliation passes: materialize, classify, plan, execute

use crate::config::ExecutorConfig;
use crate::error::SyncError;
use crate::executor::{CancelFlag, ExecutionReport, Executor};
use crate::service::PartitionService;
use crate::Result;
use lt_core::{IdAllocator, OwnerId, PartitionTree, RequestedKeys};
use planner::{Plan, PlanReport, Planner, PlannerConfig};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Why a pass did nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Label not in the allow list (normalized form attached)
    InvalidLabel(String),
    /// No keys requested
    NoItems,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidLabel(label) => write!(f, "label {:?} is not accepted", label),
            SkipReason::NoItems => write!(f, "no item ids requested"),
        }
    }
}

/// Result of a pass that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }
}

/// Plan and execution counts of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub plan: PlanReport,
    pub execution: ExecutionReport,
}

/// Runs reconciliation passes against one partition service
///
/// One instance can serve many owners; every pass uses its own id
/// allocator and shares nothing mutable with other passes.
pub struct Reconciler<S: ?Sized> {
    service: Arc<S>,
    planner: PlannerConfig,
    executor: ExecutorConfig,
    cancel: CancelFlag,
}

impl<S: PartitionService + ?Sized> Reconciler<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            planner: PlannerConfig::default(),
            executor: ExecutorConfig::default(),
            cancel: CancelFlag::new(),
        }
    }

    /// Reconciler with explicit configuration, rejected when out of range
    pub fn with_config(
        service: Arc<S>,
        planner: PlannerConfig,
        executor: ExecutorConfig,
    ) -> Result<Self> {
        planner
            .validate()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        executor.validate().map_err(SyncError::Config)?;
        Ok(Self {
            service,
            planner,
            executor,
            cancel: CancelFlag::new(),
        })
    }

    /// Flag stopping in-flight passes at their next batch boundary
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn planner_config(&self) -> &PlannerConfig {
        &self.planner
    }

    /// Read the owner's tree
    pub async fn materialize(&self, owner: &OwnerId) -> Result<PartitionTree> {
        let records = self
            .service
            .search(owner)
            .await
            .map_err(SyncError::Service)?;
        let tree = PartitionTree::from_records(records)?;
        info!(owner = %owner, nodes = tree.len(), "materialized tree");
        Ok(tree)
    }

    /// Plan an exclusion pass without executing it
    pub async fn plan_exclude(
        &self,
        owner: &OwnerId,
        label: &str,
        keys: &RequestedKeys,
    ) -> Result<Outcome<Plan>> {
        let Some(label) = self.planner.accept_label(label) else {
            warn!(owner = %owner, label, "label not accepted, skipping");
            return Ok(Outcome::Skipped(SkipReason::InvalidLabel(
                label.trim().to_lowercase(),
            )));
        };
        if keys.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NoItems));
        }

        let tree = self.materialize(owner).await?;
        let mut ids = IdAllocator::new();
        let plan = Planner::new(&self.planner).plan_exclusive(&tree, &label, keys, &mut ids)?;
        log_plan(owner, &plan);
        Ok(Outcome::Done(plan))
    }

    /// Exclude `keys` under every terminal subdivision of the owner's tree
    pub async fn exclude_items(
        &self,
        owner: &OwnerId,
        label: &str,
        keys: &RequestedKeys,
    ) -> Result<Outcome<PassReport>> {
        match self.plan_exclude(owner, label, keys).await? {
            Outcome::Done(plan) => Ok(Outcome::Done(self.execute(owner, plan).await?)),
            Outcome::Skipped(reason) => Ok(Outcome::Skipped(reason)),
        }
    }

    /// Plan an inclusion pass without executing it
    pub async fn plan_include(&self, owner: &OwnerId, keys: &RequestedKeys) -> Result<Outcome<Plan>> {
        if keys.is_empty() {
            return Ok(Outcome::Skipped(SkipReason::NoItems));
        }

        let tree = self.materialize(owner).await?;
        let mut ids = IdAllocator::new();
        let plan = Planner::new(&self.planner).plan_inclusive(&tree, keys, &mut ids)?;
        log_plan(owner, &plan);
        Ok(Outcome::Done(plan))
    }

    /// Restrict the owner's tree to exactly `keys`
    pub async fn include_only_items(
        &self,
        owner: &OwnerId,
        keys: &RequestedKeys,
    ) -> Result<Outcome<PassReport>> {
        match self.plan_include(owner, keys).await? {
            Outcome::Done(plan) => Ok(Outcome::Done(self.execute(owner, plan).await?)),
            Outcome::Skipped(reason) => Ok(Outcome::Skipped(reason)),
        }
    }

    /// Remove the owner's whole tree
    ///
    /// Returns whether a tree was removed; a root that is already gone is
    /// not an error.
    pub async fn clear(&self, owner: &OwnerId) -> Result<bool> {
        let tree = self.materialize(owner).await?;
        let Some(root) = tree.root() else {
            info!(owner = %owner, "no tree to remove");
            return Ok(false);
        };

        let removed = self.executor().remove_root(owner, root).await?;
        info!(owner = %owner, root = %root, removed, "tree removed");
        Ok(removed)
    }

    fn executor(&self) -> Executor<'_, S> {
        Executor::new(self.service.as_ref(), &self.executor).with_cancel(self.cancel.clone())
    }

    async fn execute(&self, owner: &OwnerId, plan: Plan) -> Result<PassReport> {
        let execution = if plan.is_empty() {
            info!(owner = %owner, "tree already up to date");
            ExecutionReport::default()
        } else {
            self.executor().execute(owner, &plan).await?
        };

        Ok(PassReport {
            plan: plan.report,
            execution,
        })
    }
}

fn log_plan(owner: &OwnerId, plan: &Plan) {
    let report = &plan.report;
    info!(
        owner = %owner,
        mode = %plan.mode,
        removals = report.removals,
        creations = report.creations,
        added = report.added,
        already_present = report.already_present,
        rebuilt = report.targets_rebuilt,
        extended = report.targets_extended,
        "planned pass"
    );
    if report.conflicting > 0 {
        warn!(owner = %owner, conflicting = report.conflicting, "keys present with opposite polarity");
    }
}
