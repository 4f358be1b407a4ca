//! Hardware-reserved memory estimated from the device tree.
//!
//! Every reserved-memory node carrying a `no-map` property is withheld from
//! the kernel. Its sibling `reg` property holds big-endian 32-bit cells. The
//! property is read as 16-byte lines of four words, and the third word of
//! each line is taken as the region size.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::aggregate::max_worker_count;
use crate::error::{DumpError, Result};

/// Property file marking a reserved region as unmapped.
pub const NO_MAP_FILE: &str = "no-map";
/// Property file holding the region's address and size cells.
pub const REG_FILE: &str = "reg";

const CELL_BYTES: usize = 4;
const CELLS_PER_LINE: usize = 4;
/// Index of the size word within one line.
const SIZE_CELL_INDEX: usize = 2;

/// Recursively finds every `no-map` file under `root`.
///
/// Fails only when `root` itself cannot be listed; unreadable subdirectories
/// are skipped.
pub fn discover_no_map(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|source| DumpError::Discovery {
        path: root.to_path_buf(),
        source,
    })?;
    let mut found = Vec::new();
    walk(entries, &mut found);
    found.sort();
    Ok(found)
}

fn walk(entries: fs::ReadDir, found: &mut Vec<PathBuf>) {
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            match fs::read_dir(&path) {
                Ok(children) => walk(children, found),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        } else if entry.file_name() == NO_MAP_FILE {
            found.push(path);
        }
    }
}

/// Sums the size words of a raw `reg` property, in bytes.
///
/// The final line may be short; it still counts when it holds the size word.
pub fn reg_size_bytes(raw: &[u8]) -> u64 {
    raw.chunks(CELL_BYTES * CELLS_PER_LINE)
        .filter_map(|line| {
            let start = SIZE_CELL_INDEX * CELL_BYTES;
            let cell: [u8; CELL_BYTES] = line.get(start..start + CELL_BYTES)?.try_into().ok()?;
            Some(u64::from(u32::from_be_bytes(cell)))
        })
        .fold(0u64, u64::saturating_add)
}

/// Reads the `reg` sibling of a `no-map` marker. Unreadable files count as 0.
fn read_reserved_bytes(no_map: &Path) -> u64 {
    let Some(dir) = no_map.parent() else {
        return 0;
    };
    let reg = dir.join(REG_FILE);
    match fs::read(&reg) {
        Ok(raw) => reg_size_bytes(&raw),
        Err(e) => {
            debug!("Cannot read {}: {}", reg.display(), e);
            0
        }
    }
}

/// Sums reserved bytes of `markers` using up to `threads` workers.
///
/// The markers are split into groups of `ceil(N / workers)` and each group is
/// summed by one task.
pub fn sum_reserved_bytes(markers: &[PathBuf], threads: usize) -> u64 {
    if markers.is_empty() {
        return 0;
    }
    let workers = max_worker_count(threads);
    let group_size = markers.len().div_ceil(workers);

    let sum_group = |group: &[PathBuf]| -> u64 {
        group.iter().map(|p| read_reserved_bytes(p)).sum::<u64>()
    };

    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| markers.par_chunks(group_size).map(sum_group).sum()),
        Err(e) => {
            warn!("Failed to build hardware scan pool: {} - scanning sequentially", e);
            markers.chunks(group_size).map(sum_group).sum()
        }
    }
}

/// Estimates hardware-reserved memory in kilobytes.
#[instrument]
pub fn hardware_usage_kb(root: &Path, threads: usize) -> Result<u64> {
    let markers = discover_no_map(root)?;
    debug!("Found {} no-map reserved regions", markers.len());
    Ok(sum_reserved_bytes(&markers, threads) / 1024)
}
