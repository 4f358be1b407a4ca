//! Reclaim-priority labels derived from `oom_score_adj`.

use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reclaim-priority bucket of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReclaimPriority {
    System,
    Foreground,
    SuspendDelay,
    Perceived,
    Background,
    #[default]
    Undefined,
}

impl ReclaimPriority {
    /// Report order of the buckets.
    pub const ALL: [ReclaimPriority; 6] = [
        ReclaimPriority::System,
        ReclaimPriority::Foreground,
        ReclaimPriority::SuspendDelay,
        ReclaimPriority::Perceived,
        ReclaimPriority::Background,
        ReclaimPriority::Undefined,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReclaimPriority::System => "System",
            ReclaimPriority::Foreground => "Foreground",
            ReclaimPriority::SuspendDelay => "Suspend-delay",
            ReclaimPriority::Perceived => "Perceived",
            ReclaimPriority::Background => "Background",
            ReclaimPriority::Undefined => "Undefined",
        }
    }

    /// Maps an `oom_score_adj` value (-1000..=1000) to its bucket.
    pub fn from_adj(adj: i32) -> Self {
        match adj {
            -1000..=-1 => ReclaimPriority::System,
            0..=99 => ReclaimPriority::Foreground,
            100..=199 => ReclaimPriority::SuspendDelay,
            200..=399 => ReclaimPriority::Perceived,
            400..=1000 => ReclaimPriority::Background,
            _ => ReclaimPriority::Undefined,
        }
    }
}

impl fmt::Display for ReclaimPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reads /proc/<pid>/oom_score_adj and maps it to a bucket.
pub fn read_reclaim_priority(proc_path: &Path) -> ReclaimPriority {
    let content = match fs::read_to_string(proc_path.join("oom_score_adj")) {
        Ok(c) => c,
        Err(e) => {
            debug!("Cannot read oom_score_adj in {}: {}", proc_path.display(), e);
            return ReclaimPriority::Undefined;
        }
    };
    match content.trim().parse::<i32>() {
        Ok(adj) => ReclaimPriority::from_adj(adj),
        Err(_) => ReclaimPriority::Undefined,
    }
}
