//! Process-related modules for region classification and per-process memory.
//!
//! This module provides:
//! - `classifier`: Mapping names to memory categories
//! - `memory`: Parsing of /proc/<pid>/smaps_rollup and statm
//! - `smaps`: Region table parsing of /proc/<pid>/smaps
//! - `scanner`: Process discovery and identity
//! - `priority`: Reclaim-priority buckets from oom_score_adj
//! - `graphics`: GPU/DMA usage from a device memory tracker

pub mod classifier;
pub mod graphics;
pub mod memory;
pub mod priority;
pub mod scanner;
pub mod smaps;

// Re-export commonly used types
pub use classifier::{RegionClassifier, RegionRule, ANON_PAGE_TAG, FILE_PAGE_TAG};
pub use graphics::{
    query_graphics_usage, DeviceMemoryTracker, GraphicsUsage, MemoryRecord, NoDeviceTracker,
    TrackerType,
};
pub use memory::{parse_smaps_rollup, read_vss_kb, BufferConfig, RegionSummary};
pub use priority::{read_reclaim_priority, ReclaimPriority};
pub use scanner::{collect_pids, display_process_name, read_process_name};
pub use smaps::{parse_smaps_groups, SmapsMode};
