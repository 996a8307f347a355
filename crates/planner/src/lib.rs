//! Reconciliation planning for partition trees
//!
//! This crate provides:
//! - Structural classification of terminal subdivisions
//! - Preserved-structure extraction and verification
//! - Plan building (incremental extension and local rebuilds)
//! - Planner configuration

pub mod build;
pub mod classify;
pub mod config;
pub mod plan;

// Re-exports
pub use build::Planner;
pub use classify::{classify, Classification, PreservedUnit, TerminalCase};
pub use config::{BootstrapExclusion, ConfigError, PlannerConfig};
pub use plan::{CreateOp, Mode, Plan, PlanReport};
