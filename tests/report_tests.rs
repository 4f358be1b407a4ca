//! Integration tests for the incremental memory report.
//!
//! These tests build a fake proc tree in a temp directory and drive the
//! engine through full report cycles.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use herakles_mem_report::error::{DumpError, Result};
use herakles_mem_report::process::{DeviceMemoryTracker, MemoryRecord, TrackerType};
use herakles_mem_report::process::graphics::FLAG_UNMAPPED;
use herakles_mem_report::report::{DumpStatus, EngineConfig, MemoryReport, Report, ReportRow};
use herakles_mem_report::shell::CommandRunner;
use tempfile::TempDir;

const MEMINFO: &str = "\
MemTotal:         100000 kB
MemFree:           20000 kB
MemAvailable:      60000 kB
Buffers:            1000 kB
Cached:            30000 kB
SwapCached:            0 kB
Mapped:             6000 kB
Shmem:                40 kB
KernelStack:          10 kB
PageTables:           30 kB
SUnreclaim:           20 kB
";

struct FakeProcess {
    pid: u32,
    name: &'static str,
    adj: i32,
    rss: u64,
    pss: u64,
    private_dirty: u64,
    swap_pss: u64,
}

const PROCESSES: &[FakeProcess] = &[
    FakeProcess { pid: 10, name: "init", adj: 0, rss: 1000, pss: 800, private_dirty: 300, swap_pss: 0 },
    FakeProcess { pid: 20, name: "my app", adj: 900, rss: 500, pss: 300, private_dirty: 50, swap_pss: 100 },
    FakeProcess { pid: 30, name: "kthread", adj: -1000, rss: 200, pss: 100, private_dirty: 0, swap_pss: 0 },
];

fn write_process(root: &Path, p: &FakeProcess) {
    let dir = root.join(p.pid.to_string());
    fs::create_dir_all(&dir).expect("create pid dir");
    fs::write(dir.join("comm"), format!("{}\n", p.name)).expect("write comm");
    fs::write(dir.join("oom_score_adj"), format!("{}\n", p.adj)).expect("write adj");
    fs::write(dir.join("statm"), "100 50 10 1 0 20 0\n").expect("write statm");
    fs::write(
        dir.join("smaps_rollup"),
        format!(
            "00400000-7ffd1d5fc000 ---p 00000000 00:00 0    [rollup]\n\
             Rss: {} kB\nPss: {} kB\nShared_Clean: 0 kB\nShared_Dirty: 0 kB\n\
             Private_Clean: 0 kB\nPrivate_Dirty: {} kB\nSwap: {} kB\nSwapPss: {} kB\n",
            p.rss, p.pss, p.private_dirty, p.swap_pss, p.swap_pss
        ),
    )
    .expect("write rollup");

    let mut smaps = format!(
        "55d0c1a00000-55d0c1a21000 rw-p 00000000 00:00 0    [heap]\n\
         Rss: {} kB\nPss: {} kB\nPrivate_Dirty: {} kB\nSwapPss: {} kB\n",
        p.rss, p.pss, p.private_dirty, p.swap_pss
    );
    if p.pid == 10 {
        smaps.push_str(
            "7f1c2e000000-7f1c2e021000 r-xp 00000000 fd:01 1048594    /system/lib/libc.so\n\
             Rss: 60 kB\nPss: 50 kB\nShared_Clean: 60 kB\n",
        );
    }
    fs::write(dir.join("smaps"), smaps).expect("write smaps");
}

fn fake_proc() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("meminfo"), MEMINFO).expect("write meminfo");
    fs::write(
        dir.path().join("vmallocinfo"),
        "0xffffffc0-0xffffffc1 4096 load_module+0x4c/0x1b0 pages=1 vmalloc\n\
         0xffffffc2-0xffffffc3 8192 ioremap\n",
    )
    .expect("write vmallocinfo");
    // Non-pid entries are ignored
    fs::create_dir(dir.path().join("sys")).expect("create sys");
    for p in PROCESSES {
        write_process(dir.path(), p);
    }
    dir
}

fn engine_for(root: &Path) -> MemoryReport {
    let config = EngineConfig::with_proc_root(root).with_hardware_root(root.join("no-dt"));
    MemoryReport::new(config)
}

fn find_row(report: &[ReportRow], first_cell: &str) -> Option<usize> {
    report
        .iter()
        .position(|row| row.first().map(|c| c.trim()) == Some(first_cell))
}

fn row_text(row: &ReportRow) -> String {
    row.concat()
}

fn line_starting(text: &[String], prefix: &str) -> String {
    text.iter()
        .find(|t| t.starts_with(prefix))
        .cloned()
        .unwrap_or_else(|| panic!("missing line {prefix}"))
}

/// Runs one cycle and returns the number of MoreData results plus the final status.
fn run_cycle(engine: &mut MemoryReport, report: &mut Report) -> (usize, DumpStatus) {
    let mut more = 0;
    loop {
        match engine.advance(report) {
            DumpStatus::MoreData => more += 1,
            status => return (more, status),
        }
    }
}

struct GlTracker;

impl DeviceMemoryTracker for GlTracker {
    fn dev_mem(&self, pid: u32, kind: TrackerType) -> Result<Vec<MemoryRecord>> {
        if pid != 20 {
            return Err(DumpError::ServiceUnavailable("no records".into()));
        }
        match kind {
            TrackerType::Gl => Ok(vec![
                MemoryRecord { size: 8192, flags: 0 },
                MemoryRecord { size: 2048, flags: FLAG_UNMAPPED },
            ]),
            TrackerType::Graph => Ok(Vec::new()),
        }
    }
}

#[test]
fn test_more_data_count_matches_pids() {
    let proc_dir = fake_proc();
    let mut engine = engine_for(proc_dir.path());
    let mut report = Report::new();

    let (more, status) = run_cycle(&mut engine, &mut report);
    assert_eq!(more, PROCESSES.len() + 1);
    assert_eq!(status, DumpStatus::Ok);
}

#[test]
fn test_empty_proc_root_still_completes() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("meminfo"), MEMINFO).expect("write meminfo");
    let mut engine = engine_for(dir.path());
    let mut report = Report::new();

    let (more, status) = run_cycle(&mut engine, &mut report);
    assert_eq!(more, 1);
    assert_eq!(status, DumpStatus::Ok);
}

#[test]
fn test_sorted_table_and_priority_buckets() {
    let proc_dir = fake_proc();
    let mut engine = engine_for(proc_dir.path());
    let mut report = Report::new();
    assert_eq!(engine.run_to_completion(&mut report), DumpStatus::Ok);

    assert_eq!(report[0][0], "Total Memory Usage by PID:");

    let sorted = find_row(&report, "Total Memory Usage by Size:").expect("sorted title");
    let pids: Vec<&str> = report[sorted + 2..sorted + 5]
        .iter()
        .map(|row| row[0].trim())
        .collect();
    assert_eq!(pids, vec!["10", "20", "30"]);
    assert_eq!(report[sorted + 3][1].trim(), "myapp");
    assert_eq!(report[sorted + 3][2], "400(100 in SwapPss) kB");

    let adj = find_row(&report, "Total Pss by OOM adjustment:").expect("adj title");
    let text: Vec<String> = report[adj + 1..].iter().map(row_text).collect();
    assert_eq!(text[0], "System: 100 kB");
    assert!(text[1].starts_with("kthread(pid=30): "));
    assert_eq!(text[2], "Foreground: 800 kB");
    assert_eq!(text[4], "Suspend-delay: 0 kB");
    assert_eq!(text[5], "Perceived: 0 kB");
    assert_eq!(text[6], "Background: 400 kB");
    assert!(text[7].ends_with("400 kB (100 kB in SwapPss)"));
    assert_eq!(text[8], "Undefined: 0 kB");
}

#[test]
fn test_system_sections() {
    let proc_dir = fake_proc();
    let mut engine = engine_for(proc_dir.path());
    let mut report = Report::new();
    assert_eq!(engine.run_to_completion(&mut report), DumpStatus::Ok);

    let text: Vec<String> = report.iter().map(row_text).collect();
    let line = |prefix: &str| line_starting(&text, prefix);

    assert_eq!(line("File-backed Page("), "File-backed Page(50 kB):");
    assert_eq!(line("Anonymous Page("), "Anonymous Page(1300 kB):");
    assert_eq!(line("DMA("), "DMA(0 kB):");

    // pss 1250, swapPss 100, kernel 100 + 4 vmalloc, cached 1000 + 30000 - 6000
    assert!(line("Total RAM:").ends_with("100000 kB"));
    assert!(line("Free RAM:").ends_with("45000 kB (25000 cached + 20000 free)"));
    assert!(line("Used RAM:").ends_with("1354 kB (1250 total pss + 104 kernel)"));
    assert!(line("Lost RAM:").ends_with("53746 kB"));

    assert!(line("Kernel Usage:").ends_with("104 kB"));
    assert!(line("Processes Usage:").ends_with("1350 kB"));
    // No device tree and no CMA counters: both lines are omitted
    assert!(!text.iter().any(|t| t.starts_with("Hardware Usage:")));
    assert!(!text.iter().any(|t| t.starts_with("CMA Usage:")));
    assert!(text.last().is_some_and(|t| t.starts_with("Processes Usage:")));
}

#[test]
fn test_missing_meminfo_fails_and_resets() {
    let proc_dir = fake_proc();
    fs::remove_file(proc_dir.path().join("meminfo")).expect("remove meminfo");
    let mut engine = engine_for(proc_dir.path());

    let mut report = Report::new();
    let (more, status) = run_cycle(&mut engine, &mut report);
    assert_eq!(more, PROCESSES.len() + 1);
    assert_eq!(status, DumpStatus::Fail);

    // The next call starts a fresh cycle
    let mut report = Report::new();
    assert_eq!(engine.advance(&mut report), DumpStatus::MoreData);
    assert_eq!(report[0][0], "Total Memory Usage by PID:");
}

#[test]
fn test_unreadable_process_is_skipped() {
    let proc_dir = fake_proc();
    fs::remove_file(proc_dir.path().join("20").join("smaps_rollup")).expect("remove rollup");
    let mut engine = engine_for(proc_dir.path());
    let mut report = Report::new();

    let (more, status) = run_cycle(&mut engine, &mut report);
    assert_eq!(more, PROCESSES.len() + 1);
    assert_eq!(status, DumpStatus::Ok);

    let sorted = find_row(&report, "Total Memory Usage by Size:").expect("sorted title");
    assert_eq!(report[sorted + 2][0].trim(), "10");
    assert_eq!(report[sorted + 3][0].trim(), "30");
    assert_eq!(report[sorted + 4][0], "\n");
}

#[test]
fn test_cycles_are_repeatable() {
    let proc_dir = fake_proc();
    let mut engine = engine_for(proc_dir.path());

    let mut first = Report::new();
    assert_eq!(engine.run_to_completion(&mut first), DumpStatus::Ok);
    let mut second = Report::new();
    assert_eq!(engine.run_to_completion(&mut second), DumpStatus::Ok);
    assert_eq!(first, second);
}

#[test]
fn test_graphics_memory_merged() {
    let proc_dir = fake_proc();
    let config = EngineConfig::with_proc_root(proc_dir.path())
        .with_hardware_root(proc_dir.path().join("no-dt"))
        .with_tracker(Arc::new(GlTracker));
    let mut engine = MemoryReport::new(config);
    let mut report = Report::new();
    assert_eq!(engine.run_to_completion(&mut report), DumpStatus::Ok);

    let sorted = find_row(&report, "Total Memory Usage by Size:").expect("sorted title");
    let row = &report[sorted + 3];
    assert_eq!(row[0].trim(), "20");
    // 300 pss + 2 GL + 100 swapPss
    assert_eq!(row[2], "402(100 in SwapPss) kB");
    assert_eq!(row[6].trim(), "2 kB");

    let text: Vec<String> = report.iter().map(row_text).collect();
    assert!(text.iter().any(|t| t == "DMA(2 kB):"));
}

#[test]
fn test_hardware_usage_line() {
    let proc_dir = fake_proc();
    let node = proc_dir.path().join("dt").join("region@0");
    fs::create_dir_all(&node).expect("create node");
    fs::write(node.join("no-map"), b"").expect("write no-map");
    let mut reg = Vec::new();
    for word in [0u32, 0x8000_0000, 0x0010_0000] {
        reg.extend_from_slice(&word.to_be_bytes());
    }
    fs::write(node.join("reg"), reg).expect("write reg");

    let config = EngineConfig::with_proc_root(proc_dir.path())
        .with_hardware_root(proc_dir.path().join("dt"));
    let mut engine = MemoryReport::new(config);
    let mut report = Report::new();
    assert_eq!(engine.run_to_completion(&mut report), DumpStatus::Ok);

    let text: Vec<String> = report.iter().map(row_text).collect();
    let hardware = text
        .iter()
        .find(|t| t.starts_with("Hardware Usage:"))
        .expect("hardware line");
    assert!(hardware.ends_with("1024 kB"));
}

struct CmaHelper;

impl CommandRunner for CmaHelper {
    fn run_capture(&self, _command: &str) -> Result<Vec<String>> {
        Ok(vec!["CMA used: 4096 kB".to_string()])
    }
}

#[test]
fn test_cma_helper_line() {
    let proc_dir = fake_proc();
    let mut config = EngineConfig::with_proc_root(proc_dir.path())
        .with_hardware_root(proc_dir.path().join("no-dt"))
        .with_runner(Arc::new(CmaHelper));
    config.cma_command = Some("/usr/bin/cma-usage".to_string());
    let mut engine = MemoryReport::new(config);
    let mut report = Report::new();
    assert_eq!(engine.run_to_completion(&mut report), DumpStatus::Ok);

    let text: Vec<String> = report.iter().map(row_text).collect();
    let cma = line_starting(&text, "CMA Usage:");
    assert!(cma.ends_with("4096 kB"), "unexpected line: {}", cma);
}

#[test]
fn test_single_pid_breakdown() {
    let proc_dir = fake_proc();
    let engine = engine_for(proc_dir.path());
    let mut report = Report::new();
    assert_eq!(engine.memory_info_by_pid(10, &mut report), DumpStatus::Ok);

    // 4 title lines, 2 categories, separator and total
    assert_eq!(report.len(), 8);
    assert_eq!(report[4][0].trim(), "native heap");
    assert_eq!(report[4][1].trim(), "800");
    assert_eq!(report[5][0].trim(), ".so");
    let totals: Vec<&str> = report[7].iter().map(|c| c.trim()).collect();
    assert_eq!(totals, vec!["Total", "850", "60", "0", "0", "300", "0", "0"]);
}
