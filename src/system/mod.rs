//! System-wide memory sources and derived values.
//!
//! This module provides:
//! - `meminfo`: /proc/meminfo totals
//! - `vmalloc`: /proc/vmallocinfo totals
//! - `hardware`: Reserved memory from the device tree
//! - `kernel`: Kernel-owned memory
//! - `cma`: Contiguous memory allocator usage
//! - `ram`: Total/free/used/lost breakdown

pub mod cma;
pub mod hardware;
pub mod kernel;
pub mod meminfo;
pub mod ram;
pub mod vmalloc;

pub use cma::cma_usage_kb;
pub use hardware::hardware_usage_kb;
pub use kernel::{kernel_usage_kb, kernel_used_kb};
pub use meminfo::read_meminfo;
pub use ram::{processes_usage_kb, SystemRam};
pub use vmalloc::read_vmalloc_kb;
