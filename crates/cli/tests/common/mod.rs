//! Common utilities for integration tests

pub mod cli;

use anyhow::Result;
use cli::LtreeCommand;
use lt_core::{AttributeIndex, Dimension, NodeId, NodeKind, NodeRecord};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const OWNER: &str = "customers/1/adGroups/7";

/// Isolated store and config for one test
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    /// Fresh environment whose config has no executor delays
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let config = r#"
[planner]
allowed_labels = ["a", "b", "c"]

[[planner.bootstrap_exclusions]]
index = 1
value = "promo"

[executor]
base_backoff_ms = 0
settle_delay_ms = 0
removal_settle_delay_ms = 0
"#;
        std::fs::write(dir.path().join("config.toml"), config)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("store.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// `ltree` command bound to this environment's store and config
    pub fn command(&self) -> LtreeCommand {
        let mut cmd = LtreeCommand::new(self.path());
        cmd.env("LTREE_CONFIG", &self.config_path().to_string_lossy())
            .env("RUST_LOG", "warn");
        let store = self.store_path();
        cmd.args(&["--store", &store.to_string_lossy()]);
        cmd
    }

    /// Write records to a JSON file inside the environment
    pub fn write_records(&self, name: &str, records: &[NodeRecord]) -> Result<PathBuf> {
        let path = self.path().join(name);
        std::fs::write(&path, serde_json::to_string_pretty(records)?)?;
        Ok(path)
    }
}

pub fn record(id: i64, parent: Option<i64>, kind: NodeKind, dimension: Dimension) -> NodeRecord {
    NodeRecord {
        resource_id: NodeId::new(id),
        kind,
        parent: parent.map(NodeId::new),
        dimension,
        negative: false,
        bid_micros: None,
    }
}

/// root -> [CA0 OTHERS (neg), CA0 "a" -> [CA1 OTHERS (bid 100000), CA1 "promo" (neg)]]
pub fn labelled_records() -> Vec<NodeRecord> {
    let idx = |n| AttributeIndex::new(n).unwrap();
    let mut records = vec![
        record(1, None, NodeKind::Subdivision, Dimension::Root),
        record(2, Some(1), NodeKind::Unit, Dimension::custom_attribute_others(idx(0))),
        record(3, Some(1), NodeKind::Subdivision, Dimension::custom_attribute(idx(0), "a")),
        record(4, Some(3), NodeKind::Unit, Dimension::custom_attribute_others(idx(1))),
        record(5, Some(3), NodeKind::Unit, Dimension::custom_attribute(idx(1), "promo")),
    ];
    records[1].negative = true;
    records[3].bid_micros = Some(100_000);
    records[4].negative = true;
    records
}
