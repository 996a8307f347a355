//! Planner configuration

use ahash::AHashSet;
use lt_core::AttributeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom attribute value excluded when a tree is bootstrapped from nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapExclusion {
    pub index: AttributeIndex,
    pub value: String,
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Bid for new catch-all and inclusion units (default: 200000 micros)
    pub default_bid_micros: u64,
    /// Custom attribute slot holding the ad group label (default: INDEX0)
    pub label_index: AttributeIndex,
    /// Accepted labels after normalization; empty accepts any label
    pub allowed_labels: Vec<String>,
    /// Negative units added under the label subdivision on bootstrap
    pub bootstrap_exclusions: Vec<BootstrapExclusion>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_bid_micros: 200_000,
            label_index: AttributeIndex::ZERO,
            allowed_labels: ["a", "b", "c", "no data", "no ean"]
                .into_iter()
                .map(String::from)
                .collect(),
            bootstrap_exclusions: Vec::new(),
        }
    }
}

/// Invalid planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("default bid must be positive")]
    ZeroBid,

    #[error("bootstrap exclusions must share one index, found {0} and {1}")]
    MixedExclusionIndex(AttributeIndex, AttributeIndex),

    #[error("bootstrap exclusion index {0} collides with the label index")]
    ExclusionOnLabelIndex(AttributeIndex),

    #[error("bootstrap exclusion {0:?} listed twice")]
    DuplicateExclusion(String),

    #[error("bootstrap exclusion values must not be empty")]
    EmptyExclusion,
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_bid_micros == 0 {
            return Err(ConfigError::ZeroBid);
        }

        let mut seen = AHashSet::new();
        let mut index = None;
        for exclusion in &self.bootstrap_exclusions {
            if exclusion.value.trim().is_empty() {
                return Err(ConfigError::EmptyExclusion);
            }
            if exclusion.index == self.label_index {
                return Err(ConfigError::ExclusionOnLabelIndex(exclusion.index));
            }
            match index {
                None => index = Some(exclusion.index),
                Some(first) if first != exclusion.index => {
                    return Err(ConfigError::MixedExclusionIndex(first, exclusion.index));
                }
                Some(_) => {}
            }
            if !seen.insert(exclusion.value.as_str()) {
                return Err(ConfigError::DuplicateExclusion(exclusion.value.clone()));
            }
        }

        Ok(())
    }

    /// Normalize a label and check it against the allow list
    ///
    /// Returns `None` when the label is not accepted.
    pub fn accept_label(&self, raw: &str) -> Option<String> {
        let label = raw.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }
        if self.allowed_labels.is_empty()
            || self.allowed_labels.iter().any(|allowed| allowed.trim().to_lowercase() == label)
        {
            Some(label)
        } else {
            None
        }
    }

    /// Custom attribute slot subdividing the label subdivision on bootstrap
    ///
    /// The slot of the bootstrap exclusions when there are any, otherwise
    /// the lowest slot from 1 up that is not the label slot.
    pub fn structure_index(&self) -> AttributeIndex {
        if let Some(highest) = self.bootstrap_exclusions.iter().map(|e| e.index).max() {
            return highest;
        }
        (1..=AttributeIndex::MAX)
            .filter_map(AttributeIndex::new)
            .find(|index| *index != self.label_index)
            .unwrap_or(self.label_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(n: u8) -> AttributeIndex {
        AttributeIndex::new(n).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.default_bid_micros, 200_000);
        assert_eq!(config.label_index, idx(0));
        assert_eq!(config.allowed_labels.len(), 5);
        assert!(config.bootstrap_exclusions.is_empty());
        assert!(config.validate().is_ok());
        assert_eq!(config.structure_index(), idx(1));
    }

    #[test]
    fn test_label_gate() {
        let config = PlannerConfig::default();
        assert_eq!(config.accept_label("  No Data "), Some("no data".to_string()));
        assert_eq!(config.accept_label("A"), Some("a".to_string()));
        assert_eq!(config.accept_label("z"), None);
        assert_eq!(config.accept_label("   "), None);

        let open = PlannerConfig {
            allowed_labels: Vec::new(),
            ..PlannerConfig::default()
        };
        assert_eq!(open.accept_label("Anything"), Some("anything".to_string()));
    }

    #[test]
    fn test_structure_index() {
        let config = PlannerConfig {
            bootstrap_exclusions: vec![BootstrapExclusion {
                index: idx(3),
                value: "promo".into(),
            }],
            ..PlannerConfig::default()
        };
        assert_eq!(config.structure_index(), idx(3));

        let shifted = PlannerConfig {
            label_index: idx(1),
            ..PlannerConfig::default()
        };
        assert_eq!(shifted.structure_index(), idx(2));
    }

    #[test]
    fn test_validate_exclusions() {
        let exclusion = |index: u8, value: &str| BootstrapExclusion {
            index: idx(index),
            value: value.into(),
        };

        let mixed = PlannerConfig {
            bootstrap_exclusions: vec![exclusion(1, "promo"), exclusion(2, "clearance")],
            ..PlannerConfig::default()
        };
        assert_eq!(
            mixed.validate(),
            Err(ConfigError::MixedExclusionIndex(idx(1), idx(2)))
        );

        let on_label = PlannerConfig {
            bootstrap_exclusions: vec![exclusion(0, "promo")],
            ..PlannerConfig::default()
        };
        assert!(matches!(on_label.validate(), Err(ConfigError::ExclusionOnLabelIndex(_))));

        let twice = PlannerConfig {
            bootstrap_exclusions: vec![exclusion(1, "promo"), exclusion(1, "promo")],
            ..PlannerConfig::default()
        };
        assert!(matches!(twice.validate(), Err(ConfigError::DuplicateExclusion(_))));
    }

    #[test]
    fn test_toml_partial() {
        let config: PlannerConfig = toml::from_str(
            r#"
            default_bid_micros = 150000

            [[bootstrap_exclusions]]
            index = 1
            value = "promo"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_bid_micros, 150_000);
        assert_eq!(config.allowed_labels.len(), 5);
        assert_eq!(config.bootstrap_exclusions[0].value, "promo");
    }
}
