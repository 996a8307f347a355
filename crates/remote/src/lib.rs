//! Remote partition service access and reconciliation passes
//!
//! This crate provides:
//! - The service seam (`PartitionService`): search and batch mutate
//! - Mutation executor (batching, retry with backoff, id resolution)
//! - Reconciliation pass orchestration (materialize, plan, execute)
//! - In-memory reference service

pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod reconciler;
pub mod service;

// Re-exports
pub use config::ExecutorConfig;
pub use error::{Failure, FailureKind, ServiceError, SyncError};
pub use executor::{CancelFlag, ExecutionReport, Executor};
pub use memory::{MemoryService, Snapshot};
pub use reconciler::{Outcome, PassReport, Reconciler, SkipReason};
pub use service::{MutateOperation, MutateResult, PartitionService};

/// Result type for reconciliation passes
pub type Result<T> = std::result::Result<T, SyncError>;
