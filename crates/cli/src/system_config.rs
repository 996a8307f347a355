//! System configuration
//!
//! Stored as TOML at `$CONFIG_DIR/ltree/config.toml` (override the path
//! with `LTREE_CONFIG`). A missing file means defaults.

use anyhow::{Context, Result};
use lt_core::AttributeIndex;
use planner::{BootstrapExclusion, PlannerConfig};
use remote::ExecutorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "LTREE_CONFIG";

/// Configuration persisted for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub planner: PlannerConfig,
    pub executor: ExecutorConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig {
                bootstrap_exclusions: vec![BootstrapExclusion {
                    index: AttributeIndex::new(1).unwrap_or(AttributeIndex::ZERO),
                    value: "promo".to_string(),
                }],
                ..PlannerConfig::default()
            },
            executor: ExecutorConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        self.planner
            .validate()
            .context("invalid [planner] section")?;
        self.executor
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid [executor] section")?;

        if self.executor.max_attempts > 10 {
            anyhow::bail!("executor.max_attempts must be 1-10");
        }
        if self.executor.max_batch_ops > 10_000 {
            anyhow::bail!("executor.max_batch_ops must be 1-10,000");
        }
        if self.executor.base_backoff_ms > 60_000 {
            anyhow::bail!("executor.base_backoff_ms must be 0-60,000");
        }
        Ok(())
    }
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("ltree").join("config.toml"))
}

/// Load the configuration, falling back to defaults when no file exists
pub fn load() -> Result<SystemConfig> {
    let Some(path) = config_file_path() else {
        return Ok(SystemConfig::default());
    };
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Write the configuration, creating parent directories as needed
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, text)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(())
}

/// Write the default configuration if no file exists yet
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save(&SystemConfig::default())?;
    }
    Ok(path)
}

/// Annotated example configuration
pub fn example_config() -> String {
    r#"# ltree configuration
# Location: $CONFIG_DIR/ltree/config.toml (override with LTREE_CONFIG)

[planner]
# Bid for new catch-all and inclusion units, in micros
default_bid_micros = 200000
# Custom attribute slot holding the ad group label (0-4)
label_index = 0
# Labels accepted by `ltree exclude` (empty list accepts any label)
allowed_labels = ["a", "b", "c", "no data", "no ean"]

# Excluded under the label subdivision when a tree is created from nothing.
# All entries must share one index, different from label_index.
[[planner.bootstrap_exclusions]]
index = 1
value = "promo"

[executor]
# Total submissions of one batch on concurrent modification (1-10)
max_attempts = 3
# First retry delay, doubled per attempt
base_backoff_ms = 2000
# Wait between dependent batches
settle_delay_ms = 500
# Wait after removing a whole tree
removal_settle_delay_ms = 5000
# Operations per batch (1-10,000)
max_batch_ops = 1000
"#
    .to_string()
}
