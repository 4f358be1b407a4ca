//! System memory totals from /proc/meminfo.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::aggregate::{accumulate_field, parse_key_value_filtered, FieldMap};
use crate::error::{DumpError, Result};

pub const MEM_TOTAL: &str = "MemTotal";
pub const MEM_FREE: &str = "MemFree";
pub const BUFFERS: &str = "Buffers";
pub const CACHED: &str = "Cached";
pub const MAPPED: &str = "Mapped";
pub const KERNEL_STACK: &str = "KernelStack";
pub const S_UNRECLAIM: &str = "SUnreclaim";
pub const PAGE_TABLES: &str = "PageTables";
pub const SHMEM: &str = "Shmem";
pub const CMA_TOTAL: &str = "CmaTotal";
pub const CMA_FREE: &str = "CmaFree";

/// Keys retained from /proc/meminfo; everything else is dropped.
pub const MEMINFO_FIELDS: &[&str] = &[
    MEM_TOTAL,
    MEM_FREE,
    "MemAvailable",
    BUFFERS,
    CACHED,
    "SwapCached",
    MAPPED,
    SHMEM,
    "Slab",
    "SReclaimable",
    S_UNRECLAIM,
    KERNEL_STACK,
    PAGE_TABLES,
    "VmallocUsed",
    CMA_TOTAL,
    CMA_FREE,
];

/// Parses meminfo lines from any reader.
pub fn parse_meminfo_from_reader<R: BufRead>(reader: R) -> std::io::Result<FieldMap> {
    let mut values = FieldMap::new();
    for line in reader.lines() {
        let line = line?;
        let Some((key, value)) = parse_key_value_filtered(&line, MEMINFO_FIELDS) else {
            continue;
        };
        if MEMINFO_FIELDS.contains(&key) {
            accumulate_field(&mut values, key, value);
        }
    }
    Ok(values)
}

/// Reads /proc/meminfo. Failure here is fatal for a report cycle.
pub fn read_meminfo(path: &Path) -> Result<FieldMap> {
    let file = fs::File::open(path).map_err(|e| DumpError::source_unavailable(path, e))?;
    parse_meminfo_from_reader(BufReader::new(file))
        .map_err(|e| DumpError::source_unavailable(path, e))
}
