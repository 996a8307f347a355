//! Preview a pass without submitting anything

use crate::system_config;
use crate::util;
use anyhow::{Context, Result};
use lt_core::OwnerId;
use owo_colors::OwoColorize;
use planner::Plan;
use remote::Outcome;
use std::path::PathBuf;

/// Which pass to preview
#[derive(Debug, Clone)]
pub enum PlanKind {
    Exclude { label: String },
    Include,
}

pub async fn run(
    store_path: Option<PathBuf>,
    owner: &str,
    kind: PlanKind,
    ids: &[String],
    json: bool,
) -> Result<()> {
    let config = system_config::load()?;
    let store = util::open_store(store_path)?;
    let reconciler = util::reconciler(store, &config)?;
    let owner = OwnerId::new(owner);
    let keys = util::parse_keys(ids);

    let outcome = match &kind {
        PlanKind::Exclude { label } => reconciler.plan_exclude(&owner, label, &keys).await,
        PlanKind::Include => reconciler.plan_include(&owner, &keys).await,
    }
    .with_context(|| format!("Failed to plan pass for {}", owner))?;

    let plan = match outcome {
        Outcome::Done(plan) => plan,
        Outcome::Skipped(reason) => {
            if json {
                println!("{}", serde_json::json!({ "skipped": reason.to_string() }));
            } else {
                println!("{} Skipped: {}", "→".yellow(), reason);
            }
            return Ok(());
        }
    };

    if json {
        print_json(&plan)?;
    } else {
        print_plan(&owner, &plan);
    }
    Ok(())
}

fn print_json(plan: &Plan) -> Result<()> {
    let value = serde_json::json!({
        "mode": plan.mode,
        "replaces_root": plan.replaces_root,
        "removals": plan.removals,
        "creations": plan.creations,
        "report": plan.report,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_plan(owner: &OwnerId, plan: &Plan) {
    println!(
        "{} {} pass for {}",
        "Plan:".bold(),
        plan.mode,
        owner.to_string().cyan()
    );
    println!();

    if plan.is_empty() {
        println!("{} Nothing to do", "✓".green());
        return;
    }

    for id in &plan.removals {
        let note = if plan.replaces_root { " (whole tree)" } else { "" };
        println!("  {} {}{}", "-".red(), id, note.dimmed());
    }
    for op in &plan.creations {
        println!("  {} {}", "+".green(), op);
    }
    println!();

    let report = &plan.report;
    println!(
        "  {} {} operations ({} removals, {} creations)",
        "Total:".dimmed(),
        plan.operation_count(),
        report.removals,
        report.creations
    );
    println!(
        "  {} {} to add, {} already present, {} conflicting",
        "Keys:".dimmed(),
        report.added,
        report.already_present,
        report.conflicting
    );
    if report.preserved > 0 {
        println!(
            "  {} {} existing units carried into rebuilt subtrees",
            "Preserved:".dimmed(),
            report.preserved
        );
    }
}
