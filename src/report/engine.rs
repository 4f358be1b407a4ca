//! Incremental memory report engine.
//!
//! [`MemoryReport::advance`] does a bounded amount of work per call and
//! returns [`DumpStatus::MoreData`] until the report is complete:
//!
//! 1. first call: clear cycle state, emit the process table header, list pids
//! 2. second call: start the system-wide smaps scan in the background, then
//!    handle the first pid
//! 3. one call per remaining pid: read smaps_rollup and GPU usage, emit a row
//! 4. last call: read meminfo, emit the sorted table, the reclaim-priority
//!    breakdown, wait for the background scan and emit the PSS and RAM sections
//!
//! With N pids the caller sees `MoreData` N+1 times, then `Ok` once.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use tracing::{debug, error, info, instrument, warn};

use crate::aggregate::{accumulate_into_group, max_worker_count, merge_groups, CategoryMap};
use crate::config::{
    Config, DEFAULT_HARDWARE_ROOT, DEFAULT_HARDWARE_THREADS, DEFAULT_PROC_ROOT,
    DEFAULT_SHELL_BIN_DIR, DEFAULT_SMAPS_THREADS,
};
use crate::error::Result;
use crate::process::classifier::{RegionClassifier, ANON_PAGE_TAG, CATEGORY_SEPARATOR};
use crate::process::graphics::{
    query_graphics_usage, DeviceMemoryTracker, GraphicsUsage, NoDeviceTracker, TrackerType,
};
use crate::process::memory::{
    parse_smaps_rollup, read_vss_kb, BufferConfig, RegionSummary, FIELD_PRIVATE_DIRTY, FIELD_PSS,
};
use crate::process::priority::{read_reclaim_priority, ReclaimPriority};
use crate::process::scanner::{collect_pids, display_process_name};
use crate::process::smaps::{parse_smaps_groups, SmapsMode};
use crate::shell::{CommandRunner, ShellRunner};
use crate::system::{
    cma_usage_kb, hardware_usage_kb, kernel_usage_kb, kernel_used_kb, processes_usage_kb,
    read_meminfo, SystemRam,
};

use super::format::{blank_row, Report};
use super::sections::{
    category_rows, pss_total_rows, priority_rows, process_row, process_title_rows,
    ram_category_rows, ram_usage_rows, sort_process_usages, total_rows, RamCategory,
};

/// Result of one [`MemoryReport::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStatus {
    /// The report is complete.
    Ok,
    /// Call again to continue.
    MoreData,
    /// The cycle failed; rows emitted so far are not a valid report.
    Fail,
}

/// Memory figures of one process, in kilobytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub vss: u64,
    pub rss: u64,
    pub uss: u64,
    pub pss: u64,
    pub swap_pss: u64,
    pub gl: u64,
    pub graph: u64,
    pub priority: ReclaimPriority,
}

impl ProcessUsage {
    /// Builds the usage from a rollup; GPU figures start at zero.
    pub fn from_summary(pid: u32, summary: &RegionSummary) -> Self {
        Self {
            pid,
            rss: summary.rss,
            uss: summary.uss(),
            pss: summary.pss,
            swap_pss: summary.swap_pss,
            ..Self::default()
        }
    }

    /// Adds GPU/DMA memory. It is exclusive to the process, so it counts
    /// towards USS, PSS and RSS alike.
    pub fn add_graphics(&mut self, graphics: GraphicsUsage) {
        let extra = graphics.total();
        self.gl = graphics.gl;
        self.graph = graphics.graph;
        self.uss = self.uss.saturating_add(extra);
        self.pss = self.pss.saturating_add(extra);
        self.rss = self.rss.saturating_add(extra);
    }

    /// `pss + swapPss`.
    pub fn total_pss(&self) -> u64 {
        self.pss.saturating_add(self.swap_pss)
    }

    /// Ordering key of the per-process table; compared descending.
    pub fn sort_key(&self) -> (u64, u64, u64, u64, u32) {
        (self.total_pss(), self.vss, self.rss, self.uss, self.pid)
    }
}

/// Immutable engine settings: sources, parallelism and injected services.
#[derive(Clone)]
pub struct EngineConfig {
    pub proc_root: PathBuf,
    pub hardware_root: PathBuf,
    pub hardware_threads: usize,
    pub smaps_threads: usize,
    pub buffers: BufferConfig,
    pub cma_command: Option<String>,
    pub classifier: Arc<RegionClassifier>,
    pub runner: Arc<dyn CommandRunner>,
    pub tracker: Arc<dyn DeviceMemoryTracker>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            hardware_root: PathBuf::from(DEFAULT_HARDWARE_ROOT),
            hardware_threads: DEFAULT_HARDWARE_THREADS,
            smaps_threads: DEFAULT_SMAPS_THREADS,
            buffers: BufferConfig::default(),
            cma_command: None,
            classifier: Arc::new(RegionClassifier::default()),
            runner: Arc::new(ShellRunner::new(DEFAULT_SHELL_BIN_DIR)),
            tracker: Arc::new(NoDeviceTracker),
        }
    }
}

impl EngineConfig {
    /// Derives engine settings from an effective configuration. Loads the
    /// region rules file when one is configured.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let defaults = Self::default();
        let classifier = match cfg.region_rules_file.as_deref() {
            Some(path) => Arc::new(RegionClassifier::from_file(path)?),
            None => defaults.classifier,
        };
        let bin_dir = cfg
            .shell_bin_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL_BIN_DIR));

        Ok(Self {
            proc_root: cfg.proc_root.clone().unwrap_or(defaults.proc_root),
            hardware_root: cfg.hardware_root.clone().unwrap_or(defaults.hardware_root),
            hardware_threads: cfg.hardware_threads.unwrap_or(defaults.hardware_threads),
            smaps_threads: cfg.smaps_threads.unwrap_or(defaults.smaps_threads),
            buffers: BufferConfig {
                smaps_kb: cfg.smaps_buffer_kb.unwrap_or(defaults.buffers.smaps_kb),
                smaps_rollup_kb: cfg
                    .smaps_rollup_buffer_kb
                    .unwrap_or(defaults.buffers.smaps_rollup_kb),
            },
            cma_command: cfg.cma_command.clone(),
            classifier,
            runner: Arc::new(ShellRunner::new(bin_dir)),
            tracker: defaults.tracker,
        })
    }

    /// Engine settings reading from `proc_root`, otherwise defaults.
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            ..Self::default()
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn DeviceMemoryTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_hardware_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.hardware_root = root.into();
        self
    }

    pub fn meminfo_path(&self) -> PathBuf {
        self.proc_root.join("meminfo")
    }

    pub fn vmallocinfo_path(&self) -> PathBuf {
        self.proc_root.join("vmallocinfo")
    }

    pub fn pid_path(&self, pid: u32) -> PathBuf {
        self.proc_root.join(pid.to_string())
    }
}

/// Inputs of the background system-wide smaps scan.
#[derive(Clone)]
pub struct SystemScan {
    pub proc_root: PathBuf,
    pub pids: Vec<u32>,
    pub classifier: Arc<RegionClassifier>,
    pub buf_kb: usize,
    pub threads: usize,
}

impl SystemScan {
    /// Parses `Pss`/`SwapPss` of every pid's smaps into one category map.
    /// Unreadable pids contribute nothing.
    #[instrument(skip(self), fields(pids = self.pids.len()))]
    pub fn run(&self) -> CategoryMap {
        let scan_one = |pid: &u32| -> CategoryMap {
            let mut groups = CategoryMap::new();
            let path = self.proc_root.join(pid.to_string()).join("smaps");
            if let Err(e) =
                parse_smaps_groups(&path, SmapsMode::System, &self.classifier, self.buf_kb, &mut groups)
            {
                debug!("Skipping smaps of pid {}: {}", pid, e);
            }
            groups
        };
        let merge = |mut acc: CategoryMap, other: CategoryMap| {
            merge_groups(&mut acc, other);
            acc
        };

        let workers = max_worker_count(self.threads);
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| {
                self.pids
                    .par_iter()
                    .map(scan_one)
                    .reduce(CategoryMap::new, merge)
            }),
            Err(e) => {
                warn!("Failed to build smaps scan pool: {} - scanning sequentially", e);
                self.pids.iter().map(scan_one).fold(CategoryMap::new(), merge)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Collecting,
    PerProcess,
}

/// The incremental report. One instance serves any number of cycles.
pub struct MemoryReport {
    config: EngineConfig,
    phase: Phase,
    pids: VecDeque<u32>,
    scan_pids: Vec<u32>,
    usages: Vec<ProcessUsage>,
    buckets: BTreeMap<ReclaimPriority, Vec<ProcessUsage>>,
    total_gl: u64,
    total_graph: u64,
    system_scan: Option<JoinHandle<CategoryMap>>,
}

impl MemoryReport {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            phase: Phase::Init,
            pids: VecDeque::new(),
            scan_pids: Vec::new(),
            usages: Vec::new(),
            buckets: BTreeMap::new(),
            total_gl: 0,
            total_graph: 0,
            system_scan: None,
        }
    }

    /// Performs the next step of the current cycle, appending rows to `report`.
    pub fn advance(&mut self, report: &mut Report) -> DumpStatus {
        match self.phase {
            Phase::Init => self.start_cycle(report),
            Phase::Collecting => {
                self.spawn_system_scan();
                self.phase = Phase::PerProcess;
                self.next_process(report)
            }
            Phase::PerProcess => self.next_process(report),
        }
    }

    /// Drives [`advance`](Self::advance) until the cycle ends.
    pub fn run_to_completion(&mut self, report: &mut Report) -> DumpStatus {
        loop {
            match self.advance(report) {
                DumpStatus::MoreData => continue,
                status => return status,
            }
        }
    }

    fn start_cycle(&mut self, report: &mut Report) -> DumpStatus {
        self.reset();
        report.extend(process_title_rows("PID"));

        match collect_pids(&self.config.proc_root) {
            Ok(pids) => {
                info!("Collecting memory of {} processes", pids.len());
                self.scan_pids = pids.clone();
                self.pids = pids.into();
                self.phase = Phase::Collecting;
                DumpStatus::MoreData
            }
            Err(e) => {
                error!("Failed to list processes: {}", e);
                DumpStatus::Fail
            }
        }
    }

    fn system_scan_job(&self) -> SystemScan {
        SystemScan {
            proc_root: self.config.proc_root.clone(),
            pids: self.scan_pids.clone(),
            classifier: Arc::clone(&self.config.classifier),
            buf_kb: self.config.buffers.smaps_kb,
            threads: self.config.smaps_threads,
        }
    }

    fn spawn_system_scan(&mut self) {
        let job = self.system_scan_job();
        match thread::Builder::new()
            .name("smaps-scan".into())
            .spawn(move || job.run())
        {
            Ok(handle) => self.system_scan = Some(handle),
            Err(e) => {
                warn!("Failed to start background smaps scan: {} - deferring", e);
                self.system_scan = None;
            }
        }
    }

    /// Waits for the background scan, or runs it inline when it never started.
    fn join_system_scan(&mut self) -> CategoryMap {
        match self.system_scan.take() {
            Some(handle) => match handle.join() {
                Ok(groups) => groups,
                Err(_) => {
                    error!("Background smaps scan panicked");
                    CategoryMap::new()
                }
            },
            None => self.system_scan_job().run(),
        }
    }

    fn next_process(&mut self, report: &mut Report) -> DumpStatus {
        let Some(pid) = self.pids.pop_front() else {
            return self.finalize(report);
        };

        match self.collect_process(pid) {
            Some(usage) => {
                self.total_gl = self.total_gl.saturating_add(usage.gl);
                self.total_graph = self.total_graph.saturating_add(usage.graph);
                report.push(process_row(&usage));
                self.buckets
                    .entry(usage.priority)
                    .or_default()
                    .push(usage.clone());
                self.usages.push(usage);
            }
            None => debug!("No memory data for pid {}", pid),
        }
        DumpStatus::MoreData
    }

    /// Reads one process. `None` when its rollup is unavailable.
    pub fn collect_process(&self, pid: u32) -> Option<ProcessUsage> {
        let path = self.config.pid_path(pid);
        let summary = match parse_smaps_rollup(
            &path.join("smaps_rollup"),
            self.config.buffers.smaps_rollup_kb,
        ) {
            Ok(summary) => summary,
            Err(e) => {
                debug!("Failed to read smaps_rollup of pid {}: {}", pid, e);
                return None;
            }
        };

        let mut usage = ProcessUsage::from_summary(pid, &summary);
        usage.vss = read_vss_kb(&path);
        usage.name = display_process_name(&path);
        usage.priority = read_reclaim_priority(&path);
        if let Some(graphics) = query_graphics_usage(self.config.tracker.as_ref(), pid) {
            usage.add_graphics(graphics);
        }
        Some(usage)
    }

    fn finalize(&mut self, report: &mut Report) -> DumpStatus {
        let meminfo = match read_meminfo(&self.config.meminfo_path()) {
            Ok(meminfo) => meminfo,
            Err(e) => {
                error!("Failed to read meminfo: {}", e);
                if let Some(handle) = self.system_scan.take() {
                    let _ = handle.join();
                }
                self.reset();
                return DumpStatus::Fail;
            }
        };

        report.push(blank_row());
        report.extend(process_title_rows("Size"));
        sort_process_usages(&mut self.usages);
        report.extend(self.usages.iter().map(process_row));
        report.push(blank_row());

        report.extend(priority_rows(&self.buckets));
        report.push(blank_row());

        let groups = self.join_system_scan();

        report.extend(pss_total_rows(&groups, self.total_gl, self.total_graph));
        report.push(blank_row());

        let kernel = match kernel_usage_kb(&meminfo, &self.config.vmallocinfo_path()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Kernel usage unavailable: {}", e);
                None
            }
        };
        let kernel_used = kernel.unwrap_or_else(|| kernel_used_kb(&meminfo, 0));
        let ram = SystemRam::compute(&groups, &meminfo, kernel_used);
        report.extend(ram_usage_rows(&ram));
        report.push(blank_row());

        let hardware = match hardware_usage_kb(
            &self.config.hardware_root,
            self.config.hardware_threads,
        ) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Hardware usage unavailable: {}", e);
                None
            }
        };
        let cma = cma_usage_kb(
            &meminfo,
            self.config.runner.as_ref(),
            self.config.cma_command.as_deref(),
        );
        if cma.is_none() {
            warn!("CMA usage unavailable");
        }
        report.extend(ram_category_rows(&RamCategory {
            hardware,
            cma,
            kernel,
            processes: processes_usage_kb(&groups),
        }));

        self.reset();
        DumpStatus::Ok
    }

    fn reset(&mut self) {
        self.phase = Phase::Init;
        self.pids.clear();
        self.scan_pids.clear();
        self.usages.clear();
        self.buckets.clear();
        self.total_gl = 0;
        self.total_graph = 0;
        self.system_scan = None;
    }

    /// Region breakdown of one process, outside the incremental protocol.
    pub fn memory_info_by_pid(&self, pid: u32, report: &mut Report) -> DumpStatus {
        match pid_category_map(&self.config, pid) {
            Ok(groups) => {
                report.extend(category_rows(&groups));
                report.extend(total_rows(&groups));
                DumpStatus::Ok
            }
            Err(e) => {
                error!("Failed to parse smaps of pid {}: {}", pid, e);
                DumpStatus::Fail
            }
        }
    }
}

/// Category map of one process with GPU/DMA categories added when the
/// tracker answers.
pub fn pid_category_map(config: &EngineConfig, pid: u32) -> Result<CategoryMap> {
    let mut groups = CategoryMap::new();
    parse_smaps_groups(
        &config.pid_path(pid).join("smaps"),
        SmapsMode::AppointedPid,
        &config.classifier,
        config.buffers.smaps_kb,
        &mut groups,
    )?;

    if let Some(graphics) = query_graphics_usage(config.tracker.as_ref(), pid) {
        for (kind, value) in [
            (TrackerType::Gl, graphics.gl),
            (TrackerType::Graph, graphics.graph),
        ] {
            let key = format!("{}{}{}", ANON_PAGE_TAG, CATEGORY_SEPARATOR, kind.label());
            accumulate_into_group(&key, FIELD_PSS, value, &mut groups);
            accumulate_into_group(&key, FIELD_PRIVATE_DIRTY, value, &mut groups);
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DumpError;
    use crate::process::graphics::{MemoryRecord, FLAG_UNMAPPED};

    struct FixedTracker;

    impl DeviceMemoryTracker for FixedTracker {
        fn dev_mem(&self, _pid: u32, kind: TrackerType) -> Result<Vec<MemoryRecord>> {
            match kind {
                TrackerType::Gl => Ok(vec![MemoryRecord {
                    size: 4096,
                    flags: FLAG_UNMAPPED,
                }]),
                TrackerType::Graph => Err(DumpError::ServiceUnavailable("graph".into())),
            }
        }
    }

    #[test]
    fn test_process_usage_from_summary() {
        let summary = RegionSummary {
            rss: 1000,
            pss: 800,
            private_clean: 100,
            private_dirty: 200,
            swap_pss: 5,
            ..RegionSummary::default()
        };
        let mut usage = ProcessUsage::from_summary(7, &summary);
        assert_eq!(usage.uss, 300);
        assert_eq!(usage.total_pss(), 805);

        usage.add_graphics(GraphicsUsage { gl: 4, graph: 6 });
        assert_eq!(usage.gl, 4);
        assert_eq!(usage.uss, 310);
        assert_eq!(usage.pss, 810);
        assert_eq!(usage.rss, 1010);
    }

    #[test]
    fn test_pid_category_map_adds_gpu_categories() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pid_dir = dir.path().join("12");
        std::fs::create_dir(&pid_dir).expect("mkdir");
        std::fs::write(
            pid_dir.join("smaps"),
            "00400000-00452000 r-xp 00000000 08:02 173521 /system/lib/libc.so\nPss: 10 kB\n",
        )
        .expect("write smaps");

        let config = EngineConfig::with_proc_root(dir.path()).with_tracker(Arc::new(FixedTracker));
        let groups = pid_category_map(&config, 12).expect("parse");

        let field = |key: &str, name: &str| groups.get(key).and_then(|f| f.get(name)).copied();
        assert_eq!(field("File-backed Page#.so", "Pss"), Some(10));
        assert_eq!(field("Anonymous Page#GL", "Pss"), Some(4));
        assert_eq!(field("Anonymous Page#GL", "Private_Dirty"), Some(4));
        // A failed tracker class still yields a zero category
        assert_eq!(field("Anonymous Page#Graph", "Pss"), Some(0));
    }

    #[test]
    fn test_memory_info_by_pid_missing_process() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let engine = MemoryReport::new(EngineConfig::with_proc_root(dir.path()));
        let mut report = Report::new();
        assert_eq!(engine.memory_info_by_pid(99, &mut report), DumpStatus::Fail);
        assert!(report.is_empty());
    }

    #[test]
    fn test_unlistable_proc_root_fails() {
        let engine_root = PathBuf::from("/nonexistent/proc/root");
        let mut engine = MemoryReport::new(EngineConfig::with_proc_root(engine_root));
        let mut report = Report::new();
        assert_eq!(engine.advance(&mut report), DumpStatus::Fail);
    }
}
