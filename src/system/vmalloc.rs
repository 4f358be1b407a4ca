//! Kernel virtual allocation totals from /proc/vmallocinfo.
//!
//! Line format: `0xffffa000-0xffffc000 8192 func+0x10/0x20 pages=1 vmalloc`.
//! Only lines carrying `pages=` are backed by memory; the second token is the
//! allocation size in bytes.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DumpError, Result};

const PAGES_MARKER: &str = "pages=";

/// Sums vmalloc'ed bytes and returns kilobytes.
pub fn parse_vmalloc_from_reader<R: BufRead>(reader: R) -> std::io::Result<u64> {
    let mut total_bytes: u64 = 0;
    for line in reader.lines() {
        let line = line?;
        if !line.contains(PAGES_MARKER) {
            continue;
        }
        let bytes = line
            .split_whitespace()
            .nth(1)
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(0);
        total_bytes = total_bytes.saturating_add(bytes);
    }
    Ok(total_bytes / 1024)
}

/// Reads /proc/vmallocinfo and returns the total in kilobytes.
pub fn read_vmalloc_kb(path: &Path) -> Result<u64> {
    let file = fs::File::open(path).map_err(|e| DumpError::source_unavailable(path, e))?;
    parse_vmalloc_from_reader(BufReader::new(file))
        .map_err(|e| DumpError::source_unavailable(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_vmalloc_total_scenario() {
        let input = "\
0xffffffffc0000000-0xffffffffc0002000 4096 load_module+0x1/0x2 pages=1 vmalloc
0xffffffffc0004000-0xffffffffc0007000 8192 load_module+0x1/0x2 pages=2 vmalloc
0xffffffffc0008000-0xffffffffc000a000 8192 pcpu_get_vm_areas+0x0/0x1 vm_map_ram
";
        assert_eq!(parse_vmalloc_from_reader(Cursor::new(input)).expect("parse"), 12);
    }

    #[test]
    fn test_vmalloc_bad_size_counts_zero() {
        let input = "0xffff-0xfffe notanumber pages=1 vmalloc\n";
        assert_eq!(parse_vmalloc_from_reader(Cursor::new(input)).expect("parse"), 0);
    }

    #[test]
    fn test_vmalloc_missing_source() {
        let result = read_vmalloc_kb(Path::new("/nonexistent/vmallocinfo"));
        assert!(matches!(result, Err(DumpError::SourceUnavailable { .. })));
    }
}
