//! Library surface of the ltree CLI
//!
//! Shared by the binary and the integration tests.

pub mod store;
pub mod system_config;
