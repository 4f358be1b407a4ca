//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("herakles-mem-report.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Memory Report Configuration
# =====================================
#
# Data Sources
# ------------
# proc_root: "/proc"                 # Root of the proc filesystem
# hardware_root: "/sys/firmware/devicetree/base/reserved-memory"
#                                    # Device-tree reserved-memory nodes
#
# Parallelism
# -----------
# hardware_threads: 5                # Workers for the reserved-memory scan
# smaps_threads: 5                   # Workers for the system-wide smaps scan
#
# Performance Tuning
# ------------------
# smaps_buffer_kb: 512               # Buffer size for smaps parsing
# smaps_rollup_buffer_kb: 256        # Buffer size for smaps_rollup parsing
#
# External Helpers
# ----------------
# shell_bin_dir: "/usr/bin"          # Helper commands must live here
# cma_command: null                  # Prints CMA usage in kB (null = use meminfo)
#
# Classification
# --------------
# region_rules_file: null            # TOML with [[suffix]] / [[prefix]] rules
#
# Logging
# -------
# log_level: "info"                  # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
