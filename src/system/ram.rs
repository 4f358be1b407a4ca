//! System RAM breakdown into total, free, used and lost memory.
//!
//! All quantities are kilobytes. With `pss` and `swap_pss` summed over every
//! category of the system-wide scan:
//!
//! ```text
//! cached = Buffers + Cached - Mapped
//! free   = cached + MemFree
//! used   = pss + kernel
//! lost   = MemTotal - (pss - swap_pss) - MemFree - cached - kernel - zram
//! ```
//!
//! `lost` measures memory nothing accounts for; it is clamped at zero.

use crate::aggregate::{sum_across_groups, sum_fields, CategoryMap, FieldMap};
use crate::process::memory::{FIELD_PSS, FIELD_SWAP_PSS};
use crate::system::meminfo::{BUFFERS, CACHED, MAPPED, MEM_FREE, MEM_TOTAL};

/// Compressed swap total; no zram source is read yet.
pub const ZRAM_TOTAL_KB: u64 = 0;

/// Meminfo fields forming the cached figure (`Mapped` is subtracted).
pub const CACHED_FIELDS: &[&str] = &[BUFFERS, CACHED, MAPPED];

/// Fields summed for per-category and processes PSS figures.
pub const PSS_TOTAL_FIELDS: &[&str] = &[FIELD_PSS, FIELD_SWAP_PSS];

/// RAM breakdown of one report cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemRam {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub lost: u64,
    pub total_pss: u64,
    pub total_swap_pss: u64,
    pub kernel_used: u64,
    pub cached_info: u64,
    pub free_info: u64,
    pub zram_total: u64,
}

impl SystemRam {
    /// Computes the breakdown from the system scan, meminfo and kernel usage.
    pub fn compute(groups: &CategoryMap, meminfo: &FieldMap, kernel_used: u64) -> Self {
        let total = meminfo.get(MEM_TOTAL).copied().unwrap_or(0);
        let free_info = meminfo.get(MEM_FREE).copied().unwrap_or(0);
        let cached_info = sum_fields(meminfo, CACHED_FIELDS);
        let total_pss = sum_across_groups(groups, &[FIELD_PSS]);
        let total_swap_pss = sum_across_groups(groups, &[FIELD_SWAP_PSS]);

        let lost = i128::from(total)
            - (i128::from(total_pss) - i128::from(total_swap_pss))
            - i128::from(free_info)
            - i128::from(cached_info)
            - i128::from(kernel_used)
            - i128::from(ZRAM_TOTAL_KB);

        Self {
            total,
            free: cached_info.saturating_add(free_info),
            used: total_pss.saturating_add(kernel_used),
            // An over-committed breakdown (explained > MemTotal) reports 0 lost;
            // the components then sum to more than `total`.
            lost: u64::try_from(lost.max(0)).unwrap_or(u64::MAX),
            total_pss,
            total_swap_pss,
            kernel_used,
            cached_info,
            free_info,
            zram_total: ZRAM_TOTAL_KB,
        }
    }
}

/// Total `Pss + SwapPss` over every category: memory used by processes.
pub fn processes_usage_kb(groups: &CategoryMap) -> u64 {
    sum_across_groups(groups, PSS_TOTAL_FIELDS)
}
