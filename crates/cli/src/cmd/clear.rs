//! Remove an owner's whole tree

use crate::system_config;
use crate::util;
use anyhow::{Context, Result};
use lt_core::OwnerId;
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::path::PathBuf;

pub async fn run(store_path: Option<PathBuf>, owner: &str, yes: bool) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(store_path)?;
    let owner = OwnerId::new(owner);

    let count = store.records(&owner).len();
    if count == 0 {
        println!("{} No tree stored for {}", "✓".green(), owner.to_string().cyan());
        return Ok(());
    }

    if !yes {
        print!(
            "{} Remove all {} nodes for {}? [y/N] ",
            "⚠".yellow(),
            count,
            owner.to_string().cyan()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Cancelled");
            return Ok(());
        }
    }

    let reconciler = util::reconciler(store, &config)?;
    let removed = reconciler
        .clear(&owner)
        .await
        .with_context(|| format!("Failed to remove tree for {}", owner))?;

    if removed {
        println!("{} Removed tree ({} nodes)", "✓".green(), count);
    } else {
        println!("{} Tree was already gone", "✓".green());
    }
    Ok(())
}
