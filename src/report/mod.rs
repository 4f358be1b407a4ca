//! Memory report assembly.
//!
//! This module provides:
//! - `format`: Cell padding and row helpers
//! - `sections`: Builders for every report section
//! - `engine`: The incremental report state machine
//! - `output`: Text and JSON rendering

pub mod engine;
pub mod format;
pub mod output;
pub mod sections;

pub use engine::{pid_category_map, DumpStatus, EngineConfig, MemoryReport, ProcessUsage, SystemScan};
pub use format::{Report, ReportRow};
pub use output::write_report;
