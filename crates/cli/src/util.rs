//! Shared utilities for CLI commands

use crate::store::FileStore;
use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use lt_core::RequestedKeys;
use owo_colors::OwoColorize;
use remote::{CancelFlag, Outcome, PassReport, Reconciler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Default store location: `$DATA_DIR/ltree/store.json`
pub fn default_store_path() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("Could not determine data directory")?;
    Ok(dir.join("ltree").join("store.json"))
}

/// Open the store named on the command line, or the default one
pub fn open_store(path: Option<PathBuf>) -> Result<Arc<FileStore>> {
    let path = match path {
        Some(path) => path,
        None => default_store_path()?,
    };
    Ok(Arc::new(FileStore::open(path)?))
}

/// Reconciler over `store` using the system configuration
pub fn reconciler(store: Arc<FileStore>, config: &SystemConfig) -> Result<Reconciler<FileStore>> {
    Ok(Reconciler::with_config(
        store,
        config.planner.clone(),
        config.executor.clone(),
    )?)
}

/// Join positional id arguments and split them into keys
///
/// Each argument may itself hold a `,` `;` or `|` separated list.
pub fn parse_keys(raw: &[String]) -> RequestedKeys {
    RequestedKeys::parse(&raw.join(" "))
}

/// Stop the pass at its next batch boundary on Ctrl-C
pub fn cancel_on_ctrl_c(flag: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current batch");
            flag.cancel();
        }
    });
}

/// Print the summary of a finished or skipped pass
pub fn print_outcome(outcome: &Outcome<PassReport>) {
    let report = match outcome {
        Outcome::Done(report) => report,
        Outcome::Skipped(reason) => {
            println!("{} Skipped: {}", "→".yellow(), reason);
            return;
        }
    };

    let plan = &report.plan;
    let execution = &report.execution;
    if execution.submissions == 0 {
        println!(
            "{} Already up to date ({} keys present)",
            "✓".green(),
            plan.already_present
        );
    } else {
        println!(
            "{} Applied {} batches ({} created, {} removed)",
            "✓".green(),
            execution.batches,
            execution.created,
            execution.removed
        );
    }

    println!(
        "  {} {} added, {} already present",
        "Keys:".dimmed(),
        plan.added,
        plan.already_present
    );
    if plan.duplicates > 0 {
        println!("  {} {} dropped", "Duplicates:".dimmed(), plan.duplicates);
    }
    if plan.conflicting > 0 {
        println!(
            "  {} {} present with the opposite polarity, left unchanged",
            "Conflicts:".yellow(),
            plan.conflicting
        );
    }
    println!(
        "  {} {} extended, {} rebuilt, {} skipped",
        "Targets:".dimmed(),
        plan.targets_extended,
        plan.targets_rebuilt,
        plan.targets_skipped
    );
    if execution.already_removed > 0 {
        println!(
            "  {} {} removal targets were already gone",
            "Note:".yellow(),
            execution.already_removed
        );
    }
    if !execution.backoffs.is_empty() {
        println!(
            "  {} {} retries after concurrent modification",
            "Retries:".yellow(),
            execution.backoffs.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_joins_arguments() {
        let raw = vec!["A1,A2".to_string(), "A3".to_string(), "A1".to_string()];
        let keys = parse_keys(&raw);
        assert_eq!(keys.keys(), ["A1", "A2", "A3"]);
        assert_eq!(keys.duplicates(), 1);
    }

    #[test]
    fn test_parse_keys_empty() {
        assert!(parse_keys(&[]).is_empty());
    }
}
