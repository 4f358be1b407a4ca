//! Process scanning utilities for discovering and reading process entries from /proc.
//!
//! This module provides functions to scan the /proc filesystem for process IDs
//! and read per-process identity such as the name.

use std::fs;
use std::path::Path;

use crate::error::{DumpError, Result};

/// Name reported when neither comm nor cmdline yields one.
pub const UNKNOWN_PROCESS_NAME: &str = "unknown";

/// Scans the proc root for numeric PID directories, in ascending order.
///
/// Fails only when the root itself cannot be listed.
pub fn collect_pids(root: &Path) -> Result<Vec<u32>> {
    let entries = fs::read_dir(root).map_err(|e| DumpError::source_unavailable(root, e))?;
    let mut pids: Vec<u32> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            if !entry.path().is_dir() {
                return None;
            }
            name.parse().ok()
        })
        .collect();
    pids.sort_unstable();
    Ok(pids)
}

/// Reads process name from comm file or extracts from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(s) = fs::read_to_string(&comm) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        if !content.is_empty() {
            let parts: Vec<&str> = content
                .split(|&b| b == 0u8)
                .filter_map(|s| std::str::from_utf8(s).ok())
                .collect();
            if !parts.is_empty() {
                if let Some(name) = Path::new(parts[0]).file_name() {
                    return name.to_str().map(|s| s.to_string());
                }
            }
        }
    }
    None
}

/// Process name as shown in the report: spaces removed, `unknown` fallback.
pub fn display_process_name(proc_path: &Path) -> String {
    match read_process_name(proc_path) {
        Some(name) => {
            let compact: String = name.chars().filter(|c| *c != ' ').collect();
            if compact.is_empty() {
                UNKNOWN_PROCESS_NAME.to_string()
            } else {
                compact
            }
        }
        None => UNKNOWN_PROCESS_NAME.to_string(),
    }
}
