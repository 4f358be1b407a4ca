//! herakles-mem-report - version 0.1.0
//!
//! System and per-process memory report with tracing logging.
//! This is the main entry point that resolves configuration, handles
//! subcommands and drives the report engine.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::{error, info, warn, Level};

use herakles_mem_report::cli::{Args, Commands, ReportFormat};
use herakles_mem_report::commands::{command_check, command_config, command_rules};
use herakles_mem_report::config::{resolve_config, show_config, validate_effective_config, Config};
use herakles_mem_report::report::{
    write_report, DumpStatus, EngineConfig, MemoryReport, Report,
};
use herakles_mem_report::startup_checks;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let level = match config.log_level.as_deref().unwrap_or("info") {
        "off" => return,
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {}", level);
}

/// Opens the report destination: a file when `--output` is given, stdout otherwise.
fn open_output(args: &Args) -> anyhow::Result<Box<dyn Write>> {
    match &args.output {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Runs one report cycle. Returns false when the cycle failed.
fn run_report(args: &Args, engine_config: EngineConfig) -> anyhow::Result<bool> {
    let mut engine = MemoryReport::new(engine_config);
    let mut report = Report::new();

    let status = match args.pid {
        Some(pid) => engine.memory_info_by_pid(pid, &mut report),
        None => engine.run_to_completion(&mut report),
    };

    if status != DumpStatus::Ok {
        error!("Memory report failed");
        return Ok(false);
    }

    let mut out = open_output(args)?;
    write_report(&mut out, &report, args.format.unwrap_or(ReportFormat::Text))?;
    if let Some(path) = &args.output {
        info!("Report written to {}", path.display());
    }
    Ok(true)
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    // Early config handling for show/check modes
    if args.check_config {
        if let Err(e) = validate_effective_config(&config) {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        return show_config(&config, &args.config_format);
    }

    setup_logging(&config);

    // Handle subcommands
    if let Some(command) = &args.command {
        match command {
            Commands::Check { proc, system, all } => {
                if !command_check(*proc, *system, *all, &config)? {
                    std::process::exit(1);
                }
                return Ok(());
            }
            Commands::Config {
                output,
                format,
                commented,
            } => return command_config(output.clone(), format.clone(), *commented),
            Commands::Rules { name, inode } => {
                let engine_config = EngineConfig::from_config(&config)?;
                return command_rules(&engine_config.classifier, name.as_deref(), *inode);
            }
        }
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    let engine_config = EngineConfig::from_config(&config)?;

    if let Err(e) =
        startup_checks::validate_requirements(&engine_config.proc_root, &engine_config.hardware_root)
    {
        warn!("Startup validation failed: {}", e);
    }

    if !run_report(&args, engine_config)? {
        std::process::exit(1);
    }
    Ok(())
}
