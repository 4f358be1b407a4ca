//! Contiguous memory allocator usage.
//!
//! A configured helper command takes precedence; otherwise the figure is
//! `CmaTotal - CmaFree` from meminfo.

use tracing::{debug, warn};

use crate::aggregate::{parse_key_value, parse_leading_u64, FieldMap};
use crate::shell::CommandRunner;
use crate::system::meminfo::{CMA_FREE, CMA_TOTAL};

/// Extracts a kilobyte figure from the first line of helper output.
///
/// Accepts either `Key: <n> kB` or a bare `<n>` line.
pub fn parse_cma_output(lines: &[String]) -> Option<u64> {
    let first = lines.iter().find(|l| !l.trim().is_empty())?;
    let value = match parse_key_value(first) {
        Some((_, value)) => value,
        None => parse_leading_u64(first),
    };
    Some(value)
}

/// CMA in use from meminfo, when the kernel exposes CMA counters.
pub fn cma_from_meminfo(meminfo: &FieldMap) -> Option<u64> {
    let total = *meminfo.get(CMA_TOTAL)?;
    let free = meminfo.get(CMA_FREE).copied().unwrap_or(0);
    Some(total.saturating_sub(free))
}

/// CMA usage in kilobytes, or `None` when no source is available.
pub fn cma_usage_kb(
    meminfo: &FieldMap,
    runner: &dyn CommandRunner,
    command: Option<&str>,
) -> Option<u64> {
    if let Some(command) = command {
        match runner.run_capture(command) {
            Ok(lines) => {
                if let Some(value) = parse_cma_output(&lines) {
                    return Some(value);
                }
                debug!("CMA helper '{}' produced no value", command);
            }
            Err(e) => warn!("CMA helper failed: {}", e),
        }
    }
    cma_from_meminfo(meminfo)
}
