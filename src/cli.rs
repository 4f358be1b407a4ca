//! CLI arguments and subcommands for herakles-mem-report.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Padded text rows
    Text,
    /// JSON array of rows
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-mem-report",
    about = "System and per-process memory report (PSS/USS/RSS/VSS, swap, GPU/DMA)",
    long_about = "System and per-process memory report.\n\n\
                  Reads /proc and the device tree to produce a per-process memory table, \
                  a reclaim-priority breakdown, PSS totals by memory category and a \
                  system RAM breakdown (total/free/used/lost).",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Report on a single process only
    #[arg(long)]
    pub pid: Option<u32>,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Report output format
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Override the /proc root
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Worker threads for the hardware-reserved scan
    #[arg(long)]
    pub hardware_threads: Option<usize>,

    /// Worker threads for the system-wide smaps scan
    #[arg(long)]
    pub smaps_threads: Option<usize>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and data source access
    Check {
        /// Check per-process sources
        #[arg(long)]
        proc: bool,

        /// Check system-wide sources
        #[arg(long)]
        system: bool,

        /// Check everything
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments
        #[arg(long)]
        commented: bool,
    },

    /// List the active region classification rules
    Rules {
        /// Classify a mapping name instead of listing rules
        #[arg(long)]
        name: Option<String>,

        /// Inode for --name (0 = anonymous)
        #[arg(long, default_value_t = 0)]
        inode: u64,
    },
}
