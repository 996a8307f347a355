//! Executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mutation executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Total submissions of one batch before giving up (default: 3)
    pub max_attempts: u32,
    /// First retry delay, doubled per attempt (default: 2s)
    pub base_backoff_ms: u64,
    /// Wait between dependent batches (default: 500ms)
    pub settle_delay_ms: u64,
    /// Wait after removing a whole tree (default: 5s)
    pub removal_settle_delay_ms: u64,
    /// Upper bound on operations per batch (default: 1000)
    pub max_batch_ops: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 2000,
            settle_delay_ms: 500,
            removal_settle_delay_ms: 5000,
            max_batch_ops: 1000,
        }
    }
}

impl ExecutorConfig {
    /// Delay before the submission following failed attempt `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn removal_settle_delay(&self) -> Duration {
        Duration::from_millis(self.removal_settle_delay_ms)
    }

    /// Validate ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.max_batch_ops == 0 {
            return Err("max_batch_ops must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let config = ExecutorConfig::default();
        assert_eq!(config.backoff(1), Duration::from_secs(2));
        assert_eq!(config.backoff(2), Duration::from_secs(4));
        assert_eq!(config.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_validate() {
        assert!(ExecutorConfig::default().validate().is_ok());
        let broken = ExecutorConfig {
            max_attempts: 0,
            ..ExecutorConfig::default()
        };
        assert!(broken.validate().is_err());
    }
}
