//! CLI command implementations for herakles-mem-report.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Data source and configuration validation
//! - `config`: Configuration file generation
//! - `rules`: Region classification rule listing

pub mod check;
pub mod config;
pub mod rules;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use rules::command_rules;
