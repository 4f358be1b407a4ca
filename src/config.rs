//! Configuration management for herakles-mem-report.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use crate::error::{DumpError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_HARDWARE_ROOT: &str = "/sys/firmware/devicetree/base/reserved-memory";
pub const DEFAULT_SHELL_BIN_DIR: &str = "/usr/bin";
pub const DEFAULT_HARDWARE_THREADS: usize = 5;
pub const DEFAULT_SMAPS_THREADS: usize = 5;

/// Report configuration. Every field is optional so that file values can be
/// layered under CLI overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Data sources
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "hardware-root")]
    pub hardware_root: Option<PathBuf>,

    // Parallelism
    #[serde(alias = "hardware-threads")]
    pub hardware_threads: Option<usize>,
    #[serde(alias = "smaps-threads")]
    pub smaps_threads: Option<usize>,

    // Performance tuning
    pub smaps_buffer_kb: Option<usize>,
    pub smaps_rollup_buffer_kb: Option<usize>,

    // External helpers
    /// Directory helper commands must live in
    #[serde(alias = "shell-bin-dir")]
    pub shell_bin_dir: Option<PathBuf>,
    /// Command printing CMA usage in kB; meminfo is used when unset
    #[serde(alias = "cma-command")]
    pub cma_command: Option<String>,

    // Classification
    /// TOML file with extra `[[suffix]]` / `[[prefix]]` region rules
    #[serde(alias = "region-rules-file")]
    pub region_rules_file: Option<PathBuf>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            hardware_root: Some(PathBuf::from(DEFAULT_HARDWARE_ROOT)),
            hardware_threads: Some(DEFAULT_HARDWARE_THREADS),
            smaps_threads: Some(DEFAULT_SMAPS_THREADS),
            smaps_buffer_kb: Some(512),
            smaps_rollup_buffer_kb: Some(256),
            shell_bin_dir: Some(PathBuf::from(DEFAULT_SHELL_BIN_DIR)),
            cma_command: None,
            region_rules_file: None,
            log_level: Some("info".into()),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.hardware_threads == Some(0) {
        return Err(DumpError::Config("hardware_threads must be at least 1".into()));
    }
    if cfg.smaps_threads == Some(0) {
        return Err(DumpError::Config("smaps_threads must be at least 1".into()));
    }
    if cfg.smaps_buffer_kb == Some(0) || cfg.smaps_rollup_buffer_kb == Some(0) {
        return Err(DumpError::Config(
            "smaps_buffer_kb and smaps_rollup_buffer_kb must be non-zero".into(),
        ));
    }

    if let Some(command) = cfg.cma_command.as_deref() {
        let bin_dir = cfg
            .shell_bin_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL_BIN_DIR));
        let program = command.split_whitespace().next().unwrap_or("");
        let program_path = Path::new(program);
        if !program_path.is_absolute() || !program_path.starts_with(&bin_dir) {
            return Err(DumpError::Config(format!(
                "cma_command '{}' must be an absolute path under {}",
                command,
                bin_dir.display()
            )));
        }
    }

    if let Some(rules) = cfg.region_rules_file.as_deref() {
        if let Err(e) = fs::metadata(rules) {
            return Err(DumpError::Config(format!(
                "region_rules_file is not readable: {} ({})",
                rules.display(),
                e
            )));
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(n) = args.hardware_threads {
        config.hardware_threads = Some(n);
    }
    if let Some(n) = args.smaps_threads {
        config.smaps_threads = Some(n);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(log_level_name(level).to_string());
    }

    Ok(config)
}

fn log_level_name(level: &LogLevel) -> &'static str {
    match level {
        LogLevel::Off => "off",
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/herakles/mem-report.yaml",
            "/etc/herakles/mem-report.yml",
            "/etc/herakles/mem-report.json",
            "./herakles-mem-report.yaml",
            "./herakles-mem-report.yml",
            "./herakles-mem-report.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(found) => PathBuf::from(found),
            None => return Ok(Config::default()),
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
