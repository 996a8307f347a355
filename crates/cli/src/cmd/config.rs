//! Configuration management command
//!
//! Provides CLI interface to view and edit system configuration.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use lt_core::AttributeIndex;
use owo_colors::OwoColorize;
use planner::BootstrapExclusion;

const KEYS: &[&str] = &[
    "planner.default_bid_micros",
    "planner.label_index",
    "planner.allowed_labels",
    "planner.bootstrap_exclusions",
    "executor.max_attempts",
    "executor.base_backoff_ms",
    "executor.settle_delay_ms",
    "executor.removal_settle_delay_ms",
    "executor.max_batch_ops",
];

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "System Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for &key in KEYS {
        let (prefix, name) = key.split_once('.').unwrap_or(("", key));
        if prefix != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", prefix).yellow());
            section = prefix;
        }
        println!("  {} = {}", name.cyan(), get_value(&config, key)?);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  default_bid_micros: > 0");
    println!("  label_index, bootstrap exclusion index: 0-4, must differ");
    println!("  max_attempts: 1-10");
    println!("  base_backoff_ms: 0-60,000");
    println!("  max_batch_ops: 1-10,000");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set_value(&mut config, key, value)?;

    // Validate before saving
    config.validate().context("Invalid configuration value")?;

    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), get_value(&config, key)?);
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

fn get_value(config: &SystemConfig, key: &str) -> Result<String> {
    let value = match key {
        "planner.default_bid_micros" => config.planner.default_bid_micros.to_string(),
        "planner.label_index" => config.planner.label_index.get().to_string(),
        "planner.allowed_labels" => config.planner.allowed_labels.join(","),
        "planner.bootstrap_exclusions" => config
            .planner
            .bootstrap_exclusions
            .iter()
            .map(|exclusion| format!("{}:{}", exclusion.index.get(), exclusion.value))
            .collect::<Vec<_>>()
            .join(","),
        "executor.max_attempts" => config.executor.max_attempts.to_string(),
        "executor.base_backoff_ms" => config.executor.base_backoff_ms.to_string(),
        "executor.settle_delay_ms" => config.executor.settle_delay_ms.to_string(),
        "executor.removal_settle_delay_ms" => config.executor.removal_settle_delay_ms.to_string(),
        "executor.max_batch_ops" => config.executor.max_batch_ops.to_string(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'ltree config list' to see available keys.",
            key
        ),
    };
    Ok(value)
}

fn set_value(config: &mut SystemConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "planner.default_bid_micros" => {
            config.planner.default_bid_micros = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "planner.label_index" => {
            config.planner.label_index = parse_index(value)?;
        }
        "planner.allowed_labels" => {
            config.planner.allowed_labels = value
                .split(',')
                .map(|label| label.trim().to_lowercase())
                .filter(|label| !label.is_empty())
                .collect();
        }
        "planner.bootstrap_exclusions" => {
            config.planner.bootstrap_exclusions = parse_exclusions(value)?;
        }
        "executor.max_attempts" => {
            config.executor.max_attempts = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "executor.base_backoff_ms" => {
            config.executor.base_backoff_ms = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "executor.settle_delay_ms" => {
            config.executor.settle_delay_ms = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "executor.removal_settle_delay_ms" => {
            config.executor.removal_settle_delay_ms = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "executor.max_batch_ops" => {
            config.executor.max_batch_ops = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'ltree config list' to see available keys.",
            key
        ),
    }
    Ok(())
}

fn parse_index(value: &str) -> Result<AttributeIndex> {
    let raw: u8 = value
        .trim()
        .parse()
        .context("Invalid value: must be an index from 0 to 4")?;
    AttributeIndex::new(raw).context("Invalid value: must be an index from 0 to 4")
}

/// Parse `index:value` pairs separated by commas; empty clears the list
fn parse_exclusions(value: &str) -> Result<Vec<BootstrapExclusion>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (index, value) = entry
                .split_once(':')
                .with_context(|| format!("Invalid exclusion {:?}: expected index:value", entry))?;
            Ok(BootstrapExclusion {
                index: parse_index(index)?,
                value: value.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_has_a_value() {
        let config = SystemConfig::default();
        for key in KEYS {
            assert!(get_value(&config, key).is_ok(), "{}", key);
        }
        assert!(get_value(&config, "planner.nope").is_err());
    }

    #[test]
    fn test_set_then_get() {
        let mut config = SystemConfig::default();
        set_value(&mut config, "executor.max_attempts", "5").unwrap();
        set_value(&mut config, "planner.allowed_labels", "A, b ,,C").unwrap();

        assert_eq!(get_value(&config, "executor.max_attempts").unwrap(), "5");
        assert_eq!(get_value(&config, "planner.allowed_labels").unwrap(), "a,b,c");
    }

    #[test]
    fn test_parse_exclusions() {
        let exclusions = parse_exclusions("2:promo, 2:clearance").unwrap();
        assert_eq!(exclusions.len(), 2);
        assert_eq!(exclusions[1].index.get(), 2);
        assert_eq!(exclusions[1].value, "clearance");

        assert!(parse_exclusions("").unwrap().is_empty());
        assert!(parse_exclusions("promo").is_err());
        assert!(parse_exclusions("9:promo").is_err());
    }

    #[test]
    fn test_exclusion_roundtrip_through_get() {
        let mut config = SystemConfig::default();
        set_value(&mut config, "planner.bootstrap_exclusions", "1:promo,1:sale").unwrap();
        assert_eq!(
            get_value(&config, "planner.bootstrap_exclusions").unwrap(),
            "1:promo,1:sale"
        );
    }
}
