//! CLI command implementations

pub mod clear;
pub mod config;
pub mod import;
pub mod plan;
pub mod show;
pub mod sync;
