//! Region table parsing for /proc/<pid>/smaps.
//!
//! Each mapping starts with a header line
//! (`start-end perms offset dev inode [name]`) followed by `Key: value kB`
//! lines. Body lines are attributed to the category of the most recent header.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::instrument;

use crate::aggregate::{accumulate_into_group, parse_key_value, CategoryMap};
use crate::error::{DumpError, Result};
use crate::process::classifier::RegionClassifier;
use crate::process::memory::{
    FIELD_PRIVATE_CLEAN, FIELD_PRIVATE_DIRTY, FIELD_PSS, FIELD_SHARED_CLEAN, FIELD_SHARED_DIRTY,
    FIELD_SWAP, FIELD_SWAP_PSS,
};

/// Fields kept per category when a single process is examined.
pub const APPOINTED_PID_FIELDS: &[&str] = &[
    FIELD_PSS,
    FIELD_SHARED_CLEAN,
    FIELD_SHARED_DIRTY,
    FIELD_PRIVATE_CLEAN,
    FIELD_PRIVATE_DIRTY,
    FIELD_SWAP,
    FIELD_SWAP_PSS,
];

/// Fields kept per category for the system-wide scan.
pub const SYSTEM_FIELDS: &[&str] = &[FIELD_PSS, FIELD_SWAP_PSS];

// start-end perms offset dev inode [name]
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]+-[0-9A-Fa-f]+\s+\S+\s+[0-9A-Fa-f]+\s+\S+\s+(\d+)(?:\s+(.*))?$")
        .expect("smaps header pattern is valid")
});

/// Which fields a region table scan retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmapsMode {
    /// Detailed breakdown of one process.
    AppointedPid,
    /// `Pss`/`SwapPss` only, summed over many processes.
    System,
}

impl SmapsMode {
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            SmapsMode::AppointedPid => APPOINTED_PID_FIELDS,
            SmapsMode::System => SYSTEM_FIELDS,
        }
    }
}

/// A parsed region header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionHeader<'a> {
    pub inode: u64,
    pub name: &'a str,
}

/// Recognizes a region header line.
pub fn parse_region_header(line: &str) -> Option<RegionHeader<'_>> {
    let caps = HEADER_RE.captures(line)?;
    let inode = caps.get(1)?.as_str().parse().ok()?;
    let name = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    Some(RegionHeader { inode, name })
}

/// Folds one region table into `groups`.
///
/// Lines before the first header and lines that match neither shape are
/// skipped.
pub fn parse_smaps_from_reader<R: BufRead>(
    reader: R,
    mode: SmapsMode,
    classifier: &RegionClassifier,
    groups: &mut CategoryMap,
) -> std::io::Result<()> {
    let fields = mode.fields();
    let mut category: Option<String> = None;

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = parse_region_header(&line) {
            category = Some(classifier.classify(header.name, header.inode));
            continue;
        }

        let Some(current) = category.as_deref() else {
            continue;
        };
        // Only P* and S* body lines carry retained fields.
        if !matches!(line.as_bytes().first(), Some(b'P') | Some(b'S')) {
            continue;
        }
        if let Some((key, value)) = parse_key_value(&line) {
            if fields.contains(&key) {
                accumulate_into_group(current, key, value, groups);
            }
        }
    }
    Ok(())
}

/// Parses /proc/<pid>/smaps (or any file of that shape) into `groups`.
#[instrument(skip(classifier, groups))]
pub fn parse_smaps_groups(
    path: &Path,
    mode: SmapsMode,
    classifier: &RegionClassifier,
    buf_kb: usize,
    groups: &mut CategoryMap,
) -> Result<()> {
    let file = fs::File::open(path).map_err(|e| DumpError::source_unavailable(path, e))?;
    let reader = BufReader::with_capacity(buf_kb.max(1) * 1024, file);
    parse_smaps_from_reader(reader, mode, classifier, groups)
        .map_err(|e| DumpError::source_unavailable(path, e))
}
