//! Service seam: the two remote operations a pass needs

use crate::error::ServiceError;
use async_trait::async_trait;
use lt_core::{NodeId, NodeRecord, OwnerId};
use planner::CreateOp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One operation of a mutate batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutateOperation {
    /// Parent may be permanent or a placeholder created earlier in the batch
    Create(CreateOp),
    /// Cascades to every descendant
    Remove { resource_id: NodeId },
}

impl MutateOperation {
    pub fn remove(resource_id: NodeId) -> Self {
        MutateOperation::Remove { resource_id }
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, MutateOperation::Remove { .. })
    }
}

impl fmt::Display for MutateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutateOperation::Create(op) => write!(f, "{}", op),
            MutateOperation::Remove { resource_id } => write!(f, "remove {}", resource_id),
        }
    }
}

/// Result of one operation, in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateResult {
    /// Permanent id of the created or removed node
    pub resource_id: NodeId,
}

/// Remote partition tree service
#[async_trait]
pub trait PartitionService: Send + Sync {
    /// Every partition node owned by `owner`, in any order
    async fn search(&self, owner: &OwnerId) -> Result<Vec<NodeRecord>, ServiceError>;

    /// Apply a batch atomically; results match operation order
    async fn batch_mutate(
        &self,
        owner: &OwnerId,
        operations: &[MutateOperation],
    ) -> Result<Vec<MutateResult>, ServiceError>;
}
