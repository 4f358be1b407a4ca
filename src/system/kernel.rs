//! Kernel memory usage derived from meminfo and vmallocinfo.

use std::path::Path;

use crate::aggregate::{sum_fields, FieldMap};
use crate::error::Result;
use crate::system::meminfo::{KERNEL_STACK, PAGE_TABLES, SHMEM, S_UNRECLAIM};
use crate::system::vmalloc::read_vmalloc_kb;

/// Meminfo fields counted as kernel-owned memory.
pub const KERNEL_FIELDS: &[&str] = &[KERNEL_STACK, S_UNRECLAIM, PAGE_TABLES, SHMEM];

/// Kernel-owned memory in kilobytes given an already read vmalloc total.
pub fn kernel_used_kb(meminfo: &FieldMap, vmalloc_kb: u64) -> u64 {
    sum_fields(meminfo, KERNEL_FIELDS).saturating_add(vmalloc_kb)
}

/// Kernel-owned memory in kilobytes. Fails when vmallocinfo is unreadable.
pub fn kernel_usage_kb(meminfo: &FieldMap, vmalloc_path: &Path) -> Result<u64> {
    let vmalloc_kb = read_vmalloc_kb(vmalloc_path)?;
    Ok(kernel_used_kb(meminfo, vmalloc_kb))
}
