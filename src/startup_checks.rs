//! Startup requirement validation for herakles-mem-report.
//!
//! Checks that the report can read the sources it depends on before the first
//! cycle starts. Only a missing meminfo is an error; everything else degrades
//! a single report section and is reported as a warning.

use nix::unistd::geteuid;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path, hardware_root: &Path) -> Result<(), ValidationError> {
    debug!("Validating runtime requirements...");

    check_user_privileges();
    check_meminfo(proc_root)?;
    check_proc_access(proc_root)?;
    check_optional_sources(proc_root, hardware_root);

    debug!("All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("Not running as root - smaps of other users' processes will be skipped");
    } else {
        debug!("Running as root (uid=0)");
    }
}

/// meminfo is the only source whose absence fails a report cycle.
fn check_meminfo(proc_root: &Path) -> Result<(), ValidationError> {
    let meminfo = proc_root.join("meminfo");
    match fs::metadata(&meminfo) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("Cannot access {}: {}", meminfo.display(), e);
            Err(ValidationError::MissingSource(meminfo.display().to_string()))
        }
    }
}

/// Check per-process access using init's smaps_rollup
fn check_proc_access(proc_root: &Path) -> Result<(), ValidationError> {
    let test_file = proc_root.join("1").join("smaps_rollup");

    match fs::File::open(&test_file) {
        Ok(_) => {
            debug!("{} readable: all processes visible", test_file.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!("Cannot read {} - insufficient permissions", test_file.display());
            error!("   Only user-owned processes will be reported.");
            error!("   Run as root or grant cap_dac_read_search,cap_sys_ptrace.");
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) => {
            warn!("Could not test {}: {}", test_file.display(), e);
            Ok(())
        }
    }
}

/// Sources whose absence only omits one line of the report
fn check_optional_sources(proc_root: &Path, hardware_root: &Path) {
    let vmallocinfo = proc_root.join("vmallocinfo");
    if fs::File::open(&vmallocinfo).is_err() {
        warn!("{} not readable - Kernel Usage will be omitted", vmallocinfo.display());
    }
    if !hardware_root.is_dir() {
        info!("{} not found - Hardware Usage will be omitted", hardware_root.display());
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Required source missing: {0}")]
    MissingSource(String),
}
