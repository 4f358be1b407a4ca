//! GPU/DMA memory attributed to a process by a device memory tracker.
//!
//! The tracker is an out-of-process service; the engine only sees it through
//! the [`DeviceMemoryTracker`] trait. Only allocations flagged as unmapped are
//! counted, since mapped ones already appear in the region tables.

use tracing::debug;

use crate::error::{DumpError, Result};

/// Record flag marking an allocation not mapped into the process.
pub const FLAG_UNMAPPED: u32 = 1 << 2;
/// Record flag marking an allocation mapped into the process.
pub const FLAG_MAPPED: u32 = 1 << 1;

const BYTES_PER_KB: u64 = 1024;

/// Tracker allocation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerType {
    Gl,
    Graph,
}

impl TrackerType {
    pub const ALL: [TrackerType; 2] = [TrackerType::Gl, TrackerType::Graph];

    pub fn label(self) -> &'static str {
        match self {
            TrackerType::Gl => "GL",
            TrackerType::Graph => "Graph",
        }
    }
}

/// One allocation record returned by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRecord {
    /// Size in bytes.
    pub size: u64,
    pub flags: u32,
}

impl MemoryRecord {
    pub fn is_unmapped(&self) -> bool {
        self.flags & FLAG_UNMAPPED == FLAG_UNMAPPED
    }
}

/// Unmapped GPU/DMA allocation sizes in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphicsUsage {
    pub gl: u64,
    pub graph: u64,
}

impl GraphicsUsage {
    pub fn total(&self) -> u64 {
        self.gl.saturating_add(self.graph)
    }
}

/// Query interface of the device memory tracking service.
pub trait DeviceMemoryTracker: Send + Sync {
    fn dev_mem(&self, pid: u32, kind: TrackerType) -> Result<Vec<MemoryRecord>>;
}

/// Tracker used when no device memory service is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceTracker;

impl DeviceMemoryTracker for NoDeviceTracker {
    fn dev_mem(&self, _pid: u32, _kind: TrackerType) -> Result<Vec<MemoryRecord>> {
        Err(DumpError::ServiceUnavailable(
            "no device memory tracker configured".to_string(),
        ))
    }
}

/// Size of the first unmapped record, in kilobytes.
fn first_unmapped_kb(records: &[MemoryRecord]) -> u64 {
    records
        .iter()
        .find(|r| r.is_unmapped())
        .map(|r| r.size / BYTES_PER_KB)
        .unwrap_or(0)
}

/// Queries both tracker classes for `pid`.
///
/// Returns `None` when no class could be queried. A class whose query fails
/// contributes zero.
pub fn query_graphics_usage(tracker: &dyn DeviceMemoryTracker, pid: u32) -> Option<GraphicsUsage> {
    let mut usage = GraphicsUsage::default();
    let mut answered = false;

    for kind in TrackerType::ALL {
        match tracker.dev_mem(pid, kind) {
            Ok(records) => {
                let value = first_unmapped_kb(&records);
                match kind {
                    TrackerType::Gl => usage.gl = value,
                    TrackerType::Graph => usage.graph = value,
                }
                answered = true;
            }
            Err(e) => {
                debug!("Device memory query {} for pid {} failed: {}", kind.label(), pid, e);
            }
        }
    }

    answered.then_some(usage)
}
