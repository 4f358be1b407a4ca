//! Memory parsing utilities for reading process memory metrics from /proc.
//!
//! This module reads the pre-aggregated `/proc/<pid>/smaps_rollup` summary and
//! the virtual size from `/proc/<pid>/statm`. All values are in kilobytes.

use once_cell::sync::Lazy;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::aggregate::parse_key_value;
use crate::error::{DumpError, Result};

pub const FIELD_RSS: &str = "Rss";
pub const FIELD_PSS: &str = "Pss";
pub const FIELD_SHARED_CLEAN: &str = "Shared_Clean";
pub const FIELD_SHARED_DIRTY: &str = "Shared_Dirty";
pub const FIELD_PRIVATE_CLEAN: &str = "Private_Clean";
pub const FIELD_PRIVATE_DIRTY: &str = "Private_Dirty";
pub const FIELD_SWAP: &str = "Swap";
pub const FIELD_SWAP_PSS: &str = "SwapPss";

/// Buffer configuration for parsing operations.
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig {
    pub smaps_kb: usize,
    pub smaps_rollup_kb: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            smaps_kb: 512,
            smaps_rollup_kb: 256,
        }
    }
}

/// System page size in kilobytes, used to convert statm pages.
pub static PAGE_SIZE_KB: Lazy<u64> = Lazy::new(get_page_size_kb);

fn get_page_size_kb() -> u64 {
    // SAFETY: sysconf has no preconditions for _SC_PAGESIZE
    let bytes = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if bytes > 0 {
        (bytes as u64 / 1024).max(1)
    } else {
        4
    }
}

/// Rollup of one region table, in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionSummary {
    pub rss: u64,
    pub pss: u64,
    pub shared_clean: u64,
    pub shared_dirty: u64,
    pub private_clean: u64,
    pub private_dirty: u64,
    pub swap: u64,
    pub swap_pss: u64,
}

impl RegionSummary {
    /// Unique set size: memory private to the process.
    pub fn uss(&self) -> u64 {
        self.private_clean.saturating_add(self.private_dirty)
    }

    /// Applies one `key: value` line. Unknown keys are ignored.
    ///
    /// Dispatch is on the first byte so that the frequent uninteresting
    /// lines (`Size`, `KernelPageSize`, `Anonymous`, ...) are rejected early.
    pub fn apply_line(&mut self, line: &str) {
        let slot = match line.as_bytes().first() {
            Some(b'R') | Some(b'P') | Some(b'S') => match parse_key_value(line) {
                Some((key, value)) => self.field_mut(key).map(|slot| (slot, value)),
                None => None,
            },
            _ => None,
        };
        if let Some((slot, value)) = slot {
            *slot = slot.saturating_add(value);
        }
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut u64> {
        match key {
            FIELD_RSS => Some(&mut self.rss),
            FIELD_PSS => Some(&mut self.pss),
            FIELD_PRIVATE_CLEAN => Some(&mut self.private_clean),
            FIELD_PRIVATE_DIRTY => Some(&mut self.private_dirty),
            FIELD_SHARED_CLEAN => Some(&mut self.shared_clean),
            FIELD_SHARED_DIRTY => Some(&mut self.shared_dirty),
            FIELD_SWAP => Some(&mut self.swap),
            FIELD_SWAP_PSS => Some(&mut self.swap_pss),
            _ => None,
        }
    }
}

/// Parses rollup lines from any reader.
pub fn parse_rollup_from_reader<R: BufRead>(reader: R) -> Result<RegionSummary> {
    let mut summary = RegionSummary::default();
    for line in reader.lines() {
        let line = line.map_err(|e| DumpError::source_unavailable("smaps_rollup", e))?;
        summary.apply_line(&line);
    }
    Ok(summary)
}

/// Fast parser for /proc/<pid>/smaps_rollup (Linux >= 4.14).
pub fn parse_smaps_rollup(path: &Path, buf_kb: usize) -> Result<RegionSummary> {
    let file = fs::File::open(path).map_err(|e| DumpError::source_unavailable(path, e))?;
    let reader = BufReader::with_capacity(buf_kb.max(1) * 1024, file);
    parse_rollup_from_reader(reader).map_err(|e| match e {
        DumpError::SourceUnavailable { source, .. } => DumpError::source_unavailable(path, source),
        other => other,
    })
}

/// Reads the virtual set size in kilobytes from /proc/<pid>/statm.
///
/// Returns 0 when the file is missing or its first field is not numeric.
pub fn read_vss_kb(proc_path: &Path) -> u64 {
    let content = match fs::read_to_string(proc_path.join("statm")) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    content
        .split_whitespace()
        .next()
        .and_then(|pages| pages.parse::<u64>().ok())
        .map(|pages| pages.saturating_mul(*PAGE_SIZE_KB))
        .unwrap_or(0)
}
