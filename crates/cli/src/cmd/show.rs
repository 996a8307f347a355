//! Show stored trees

use crate::util;
use anyhow::{Context, Result};
use lt_core::{validate, OwnerId};
use owo_colors::OwoColorize;
use planner::{classify, TerminalCase};
use std::path::PathBuf;

pub async fn run(store_path: Option<PathBuf>, owner: Option<String>) -> Result<()> {
    let store = util::open_store(store_path)?;

    let Some(owner) = owner else {
        let owners = store.owners();
        if owners.is_empty() {
            println!("{}", "No trees stored".dimmed());
            println!("  Use 'ltree import' or 'ltree include' to create one");
            return Ok(());
        }

        println!("{}", "Stored Trees".bold());
        for owner in owners {
            let count = store.records(&owner).len();
            println!("  {} {}", owner.to_string().cyan(), format!("({} nodes)", count).dimmed());
        }
        return Ok(());
    };

    let owner = OwnerId::new(owner);
    let tree = store
        .tree(&owner)
        .with_context(|| format!("Failed to materialize tree for {}", owner))?;

    println!("{} {}", "Owner:".bold(), owner.to_string().cyan());
    println!("{} {}", "Store:".dimmed(), store.path().display().dimmed());
    println!();

    if tree.is_empty() {
        println!("{}", "(empty tree)".dimmed());
        return Ok(());
    }

    for line in tree.to_string().lines() {
        if line.contains("NEGATIVE") {
            println!("{}", line.red());
        } else if line.trim_start().starts_with("SUBDIVISION") {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
    println!();

    match validate(&tree) {
        Ok(()) => println!("{} Structure valid ({} nodes)", "✓".green(), tree.len()),
        Err(e) => println!("{} {}", "✗".red(), e),
    }

    let classification = classify(&tree);
    let mut keyed = 0;
    let mut empty = 0;
    let mut convert = 0;
    for (_, case) in classification.targets() {
        match case {
            TerminalCase::AlreadyKeyed { .. } => keyed += 1,
            TerminalCase::Empty => empty += 1,
            TerminalCase::NeedsConversion { .. } => convert += 1,
            _ => {}
        }
    }
    println!(
        "  {} {} keyed, {} empty, {} needing conversion, {} blocked",
        "Targets:".dimmed(),
        keyed,
        empty,
        convert,
        classification.blocked()
    );

    Ok(())
}
