//! Partition tree model for listing-group reconciliation
//!
//! This crate provides:
//! - Node and dimension types (`PartitionNode`, `Dimension`)
//! - Arena-backed tree materialized from flat remote records
//! - Structural validation of the remote invariants
//! - Placeholder id allocation for not-yet-created nodes
//! - Requested key deduplication

pub mod alloc;
pub mod dimension;
pub mod error;
pub mod keys;
pub mod node;
pub mod tree;
pub mod validate;

// Re-exports
pub use alloc::IdAllocator;
pub use dimension::{AttributeIndex, Dimension, DimensionKind};
pub use error::{Error, Rule};
pub use keys::RequestedKeys;
pub use node::{NodeId, NodeKind, NodeRecord, OwnerId, PartitionNode};
pub use tree::PartitionTree;
pub use validate::validate;

/// Result type for tree operations
pub type Result<T> = std::result::Result<T, Error>;
