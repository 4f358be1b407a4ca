//! Check command implementation.
//!
//! Validates data source access and configuration.

use crate::config::{validate_effective_config, Config};
use crate::process::{collect_pids, parse_smaps_rollup};
use crate::report::EngineConfig;
use crate::system::{hardware_usage_kb, read_meminfo, read_vmalloc_kb};

/// Validates data sources and configuration. Returns false when a check failed.
pub fn command_check(proc: bool, system: bool, all: bool, config: &Config) -> anyhow::Result<bool> {
    println!("🔍 Herakles Memory Report - System Check");
    println!("========================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    let engine = match validate_effective_config(config)
        .and_then(|_| EngineConfig::from_config(config))
    {
        Ok(engine) => {
            println!("   ✅ Configuration is valid");
            engine
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            return Ok(false);
        }
    };

    if proc || all {
        println!("\n📁 Checking per-process sources...");
        match collect_pids(&engine.proc_root) {
            Ok(pids) if !pids.is_empty() => {
                println!("   ✅ Found {} processes", pids.len());
            }
            Ok(_) => {
                println!("   ❌ No process entries in {}", engine.proc_root.display());
                all_ok = false;
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        let own = engine.pid_path(std::process::id());
        match parse_smaps_rollup(&own.join("smaps_rollup"), engine.buffers.smaps_rollup_kb) {
            Ok(summary) => println!(
                "   ✅ smaps_rollup parsing successful: RSS={} kB, PSS={} kB, USS={} kB",
                summary.rss,
                summary.pss,
                summary.uss()
            ),
            Err(e) => {
                println!("   ❌ smaps_rollup parsing failed: {}", e);
                all_ok = false;
            }
        }
    }

    if system || all {
        println!("\n💾 Checking system sources...");
        match read_meminfo(&engine.meminfo_path()) {
            Ok(values) => println!("   ✅ meminfo readable ({} fields)", values.len()),
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
        report_optional("vmallocinfo", read_vmalloc_kb(&engine.vmallocinfo_path()));
        report_optional(
            "reserved memory",
            hardware_usage_kb(&engine.hardware_root, engine.hardware_threads),
        );
        if !engine.hardware_root.is_dir() {
            println!("   ℹ️  Hardware Usage will be omitted from reports");
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed");
    } else {
        println!("   ❌ Some checks failed - please review warnings");
    }
    Ok(all_ok)
}

fn report_optional(name: &str, result: crate::error::Result<u64>) {
    match result {
        Ok(kb) => println!("   ✅ {}: {} kB", name, kb),
        Err(e) => println!("   ⚠️  {} unavailable: {}", name, e),
    }
}
