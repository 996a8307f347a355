//! File-backed partition service
//!
//! Keeps every owner's tree in one JSON snapshot. Each committed batch is
//! written back before the call returns, so a crash mid-pass leaves the
//! file at the last committed batch. A batch whose write fails is rolled
//! back in memory as well.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lt_core::{validate, NodeRecord, OwnerId, PartitionTree};
use remote::{
    FailureKind, MemoryService, MutateOperation, MutateResult, PartitionService, ServiceError,
    Snapshot,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Partition service persisted to a JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryService,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store {}", path.display()))?;
            serde_json::from_str::<Snapshot>(&text)
                .with_context(|| format!("Failed to parse store {}", path.display()))?
        } else {
            Snapshot::default()
        };

        debug!(path = %path.display(), owners = snapshot.owners.len(), "opened store");
        Ok(Self {
            path,
            inner: MemoryService::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state atomically
    pub fn save(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let json = serde_json::to_string_pretty(&self.inner.snapshot())
            .context("Failed to serialize store")?;
        let mut file = tempfile::NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        file.write_all(json.as_bytes())
            .context("Failed to write store")?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to replace store {}", self.path.display()))?;
        Ok(())
    }

    /// Replace an owner's tree with externally supplied records
    ///
    /// The records must form a structurally valid tree.
    pub fn import(&self, owner: &OwnerId, records: Vec<NodeRecord>) -> Result<usize> {
        let tree = PartitionTree::from_records(records.clone())
            .with_context(|| format!("Records for {} do not form a tree", owner))?;
        validate(&tree).with_context(|| format!("Tree for {} is invalid", owner))?;

        let before = self.inner.snapshot();
        self.inner.seed(owner, records);
        if let Err(e) = self.save() {
            self.inner.restore(before);
            return Err(e);
        }
        Ok(tree.len())
    }

    pub fn records(&self, owner: &OwnerId) -> Vec<NodeRecord> {
        self.inner.records(owner)
    }

    pub fn tree(&self, owner: &OwnerId) -> Result<PartitionTree> {
        Ok(self.inner.tree(owner)?)
    }

    pub fn owners(&self) -> Vec<OwnerId> {
        self.inner.owners()
    }
}

#[async_trait]
impl PartitionService for FileStore {
    async fn search(&self, owner: &OwnerId) -> Result<Vec<NodeRecord>, ServiceError> {
        self.inner.search(owner).await
    }

    async fn batch_mutate(
        &self,
        owner: &OwnerId,
        operations: &[MutateOperation],
    ) -> Result<Vec<MutateResult>, ServiceError> {
        let before = self.inner.snapshot();
        let results = self.inner.batch_mutate(owner, operations).await?;
        if let Err(e) = self.save() {
            self.inner.restore(before);
            return Err(ServiceError::single(0, FailureKind::Other, format!("{:#}", e)));
        }
        Ok(results)
    }
}
