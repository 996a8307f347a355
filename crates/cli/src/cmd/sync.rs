//! Exclusion and inclusion passes

use crate::system_config;
use crate::util;
use anyhow::{Context, Result};
use lt_core::OwnerId;
use std::path::PathBuf;
use tracing::info;

/// Exclude the given item ids under every terminal subdivision
pub async fn run_exclude(
    store_path: Option<PathBuf>,
    owner: &str,
    label: &str,
    ids: &[String],
) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(store_path)?;
    let reconciler = util::reconciler(store, &config)?;
    util::cancel_on_ctrl_c(reconciler.cancel_flag());

    let owner = OwnerId::new(owner);
    let keys = util::parse_keys(ids);
    info!(owner = %owner, label, keys = keys.len(), "starting exclusion pass");

    let outcome = reconciler
        .exclude_items(&owner, label, &keys)
        .await
        .with_context(|| format!("Exclusion pass failed for {}", owner))?;

    util::print_outcome(&outcome);
    Ok(())
}

/// Restrict the tree to exactly the given item ids
pub async fn run_include(store_path: Option<PathBuf>, owner: &str, ids: &[String]) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(store_path)?;
    let reconciler = util::reconciler(store, &config)?;
    util::cancel_on_ctrl_c(reconciler.cancel_flag());

    let owner = OwnerId::new(owner);
    let keys = util::parse_keys(ids);
    info!(owner = %owner, keys = keys.len(), "starting inclusion pass");

    let outcome = reconciler
        .include_only_items(&owner, &keys)
        .await
        .with_context(|| format!("Inclusion pass failed for {}", owner))?;

    util::print_outcome(&outcome);
    Ok(())
}
