//! Herakles Memory Report Library
//!
//! This library reads per-process and system memory statistics from `/proc`
//! and the device tree, classifies memory regions into categories and builds
//! a tabular memory report.
//!
//! # Features
//!
//! - **Per-process table**: PSS/USS/RSS/VSS, swap PSS and GPU/DMA memory
//! - **Reclaim-priority breakdown**: processes grouped by `oom_score_adj`
//! - **Category totals**: PSS per memory category across the whole system
//! - **RAM breakdown**: total/free/used/lost plus hardware, CMA and kernel usage
//! - **Incremental protocol**: bounded work per call, system scan overlapped
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_mem_report::report::{DumpStatus, EngineConfig, MemoryReport, Report};
//!
//! let mut engine = MemoryReport::new(EngineConfig::default());
//! let mut report = Report::new();
//! while engine.advance(&mut report) == DumpStatus::MoreData {}
//!
//! for row in &report {
//!     println!("{}", row.concat());
//! }
//! ```

pub mod aggregate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod process;
pub mod report;
pub mod shell;
pub mod startup_checks;
pub mod system;

// Re-export main types for convenience
pub use error::{DumpError, Result};
pub use report::{DumpStatus, EngineConfig, MemoryReport, Report, ReportRow};
