//! Import and export raw node records

use crate::util;
use anyhow::{Context, Result};
use lt_core::{NodeRecord, OwnerId};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Replace an owner's tree with the records in a JSON file
pub async fn run_import(store_path: Option<PathBuf>, owner: &str, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records: Vec<NodeRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse node records from {}", file.display()))?;

    let store = util::open_store(store_path)?;
    let owner = OwnerId::new(owner);
    let count = store.import(&owner, records)?;

    println!(
        "{} Imported {} nodes for {}",
        "✓".green(),
        count,
        owner.to_string().cyan()
    );
    Ok(())
}

/// Write an owner's records as JSON, to a file or stdout
pub async fn run_export(
    store_path: Option<PathBuf>,
    owner: &str,
    output: Option<&Path>,
) -> Result<()> {
    let store = util::open_store(store_path)?;
    let owner = OwnerId::new(owner);
    let json = serde_json::to_string_pretty(&store.records(&owner))?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Exported to {}", "✓".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
