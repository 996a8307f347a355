//! Workflow integration tests
//!
//! Each workflow drives several commands against one store and checks
//! the stored tree between steps.

pub mod config_commands;
pub mod exclusion;
pub mod inclusion;
pub mod import_export;
