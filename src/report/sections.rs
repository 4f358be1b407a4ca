//! Report section builders.
//!
//! Every function here is pure: it turns already collected values into rows
//! and never touches the filesystem.

use std::collections::BTreeMap;

use crate::aggregate::{sum_fields, CategoryMap};
use crate::process::classifier::{split_category, ANON_PAGE_TAG, FILE_PAGE_TAG, OTHER_LABEL};
use crate::process::graphics::TrackerType;
use crate::process::memory::{
    FIELD_PRIVATE_CLEAN, FIELD_PRIVATE_DIRTY, FIELD_PSS, FIELD_SHARED_CLEAN, FIELD_SHARED_DIRTY,
    FIELD_SWAP, FIELD_SWAP_PSS,
};
use crate::process::priority::ReclaimPriority;
use crate::system::ram::{SystemRam, PSS_TOTAL_FIELDS};

use super::engine::ProcessUsage;
use super::format::{
    add_kb_unit, left, right, separator, title_row, ReportRow, KB_UNIT, KB_WIDTH, LINE_WIDTH,
    NAME_AND_PID_WIDTH, NAME_WIDTH, PID_WIDTH, RAM_WIDTH,
};

/// Column titles of the single-pid table, as `top_bottom` pairs.
pub const TITLE_WITH_PID: &[&str] = &[
    "Pss_Total",
    "Shared_Clean",
    "Shared_Dirty",
    "Private_Clean",
    "Private_Dirty",
    "Swap_Total",
    "SwapPss_Total",
];

/// Fields printed per category row of the single-pid table.
pub const VALUE_WITH_PID: &[&str] = &[
    FIELD_PSS,
    FIELD_SHARED_CLEAN,
    FIELD_SHARED_DIRTY,
    FIELD_PRIVATE_CLEAN,
    FIELD_PRIVATE_DIRTY,
    FIELD_SWAP,
    FIELD_SWAP_PSS,
];

pub const DMA_TAG: &str = "DMA";

/// Four header lines of the single-pid table: titles, subtitles, unit, dashes.
pub fn memory_title_rows() -> Vec<ReportRow> {
    let space = right(" ", LINE_WIDTH);
    let unit = right(&format!("({KB_UNIT} )"), LINE_WIDTH);
    let dashes = separator(LINE_WIDTH);

    let mut line1 = vec![space.clone()];
    let mut line2 = vec![space.clone()];
    let mut line3 = vec![space.clone()];
    let mut line4 = vec![space];

    for title in TITLE_WITH_PID {
        if let Some((top, bottom)) = title.split_once('_') {
            line1.push(right(top, LINE_WIDTH));
            line2.push(right(bottom, LINE_WIDTH));
            line3.push(unit.clone());
            line4.push(dashes.clone());
        }
    }

    vec![line1, line2, line3, line4]
}

/// Row label of a category key; `other` keeps its page class.
fn category_label(key: &str) -> String {
    let (page, label) = split_category(key);
    if label == OTHER_LABEL {
        if page == FILE_PAGE_TAG {
            "FilePage other".to_string()
        } else {
            "AnonPage other".to_string()
        }
    } else {
        label.to_string()
    }
}

/// Single-pid table: header plus one row per category.
pub fn category_rows(groups: &CategoryMap) -> Vec<ReportRow> {
    let mut rows = memory_title_rows();
    for (key, values) in groups {
        let mut row = vec![right(&category_label(key), LINE_WIDTH)];
        for field in VALUE_WITH_PID {
            let value = values.get(*field).copied().unwrap_or(0);
            row.push(right(&value.to_string(), LINE_WIDTH));
        }
        rows.push(row);
    }
    rows
}

/// Separator line and `Total` line summing every category.
pub fn total_rows(groups: &CategoryMap) -> Vec<ReportRow> {
    let total = |field: &str| -> u64 {
        groups
            .values()
            .filter_map(|values| values.get(field))
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    };

    let pss = total(FIELD_PSS);
    let swap_pss = total(FIELD_SWAP_PSS);
    let cells = [
        "Total".to_string(),
        pss.saturating_add(swap_pss).to_string(),
        total(FIELD_SHARED_CLEAN).to_string(),
        total(FIELD_SHARED_DIRTY).to_string(),
        total(FIELD_PRIVATE_CLEAN).to_string(),
        total(FIELD_PRIVATE_DIRTY).to_string(),
        total(FIELD_SWAP).to_string(),
        swap_pss.to_string(),
    ];

    let lines = cells.iter().map(|_| separator(LINE_WIDTH)).collect();
    let values = cells.iter().map(|c| right(c, LINE_WIDTH)).collect();
    vec![lines, values]
}

/// `Total Memory Usage by <sort_type>:` title and column header.
pub fn process_title_rows(sort_type: &str) -> Vec<ReportRow> {
    let header = vec![
        left("PID", PID_WIDTH),
        left("Name", NAME_WIDTH),
        "Total Pss(xxx in SwapPss)".to_string(),
        right("Total Vss", KB_WIDTH),
        right("Total Rss", KB_WIDTH),
        right("Total Uss", KB_WIDTH),
        right(TrackerType::Gl.label(), KB_WIDTH),
        right(TrackerType::Graph.label(), KB_WIDTH),
    ];
    vec![
        title_row(format!("Total Memory Usage by {sort_type}:")),
        header,
    ]
}

/// One per-process table row.
pub fn process_row(usage: &ProcessUsage) -> ReportRow {
    let name = usage.name.replace(' ', "");
    vec![
        left(&usage.pid.to_string(), PID_WIDTH),
        left(&name, NAME_WIDTH),
        format!(
            "{}({} in SwapPss) kB",
            usage.total_pss(),
            usage.swap_pss
        ),
        right(&add_kb_unit(usage.vss), KB_WIDTH),
        right(&add_kb_unit(usage.rss), KB_WIDTH),
        right(&add_kb_unit(usage.uss), KB_WIDTH),
        right(&add_kb_unit(usage.gl), KB_WIDTH),
        right(&add_kb_unit(usage.graph), KB_WIDTH),
    ]
}

/// Sorts by `(pss + swapPss, vss, rss, uss, pid)`, all descending.
pub fn sort_process_usages(usages: &mut [ProcessUsage]) {
    usages.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

/// `Total Pss by OOM adjustment:` section. Every bucket is printed, empty
/// ones as zero.
pub fn priority_rows(buckets: &BTreeMap<ReclaimPriority, Vec<ProcessUsage>>) -> Vec<ReportRow> {
    let mut rows = vec![title_row("Total Pss by OOM adjustment:")];

    for priority in ReclaimPriority::ALL {
        let mut members: Vec<&ProcessUsage> = buckets
            .get(&priority)
            .map(|v| v.iter().collect())
            .unwrap_or_default();

        let total = members
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.total_pss()));
        rows.push(title_row(format!("{}: {}", priority.label(), add_kb_unit(total))));

        members.sort_by(|a, b| b.total_pss().cmp(&a.total_pss()));
        for usage in members {
            let name = left(&format!("{}(pid={}): ", usage.name, usage.pid), NAME_AND_PID_WIDTH);
            let mut row = vec![format!("{}{}", name, add_kb_unit(usage.total_pss()))];
            if usage.swap_pss > 0 {
                row.push(format!(" ({} kB in SwapPss)", usage.swap_pss));
            }
            rows.push(row);
        }
    }
    rows
}

/// `<title>(<sum> kB):` followed by one line per entry, largest first.
fn labelled_totals(title: &str, mut entries: Vec<(String, u64)>) -> Vec<ReportRow> {
    let total = entries
        .iter()
        .fold(0u64, |acc, (_, v)| acc.saturating_add(*v));
    let mut rows = vec![title_row(format!("{}({}):", title, add_kb_unit(total)))];

    entries.sort_by(|a, b| b.1.cmp(&a.1));
    for (label, value) in entries {
        rows.push(title_row(format!(
            "{} : {}",
            right(&add_kb_unit(value), RAM_WIDTH),
            label
        )));
    }
    rows
}

/// `Total Pss by Category:` section from the system-wide scan plus the
/// cycle's summed GPU/DMA figures.
pub fn pss_total_rows(groups: &CategoryMap, total_gl: u64, total_graph: u64) -> Vec<ReportRow> {
    let mut file_page = Vec::new();
    let mut anon_page = Vec::new();

    for (key, values) in groups {
        let (page, label) = split_category(key);
        let pss = sum_fields(values, PSS_TOTAL_FIELDS);
        if page == FILE_PAGE_TAG {
            file_page.push((label.to_string(), pss));
        } else {
            anon_page.push((label.to_string(), pss));
        }
    }

    let dma = vec![
        (TrackerType::Gl.label().to_string(), total_gl),
        (TrackerType::Graph.label().to_string(), total_graph),
    ];

    let mut rows = vec![title_row("Total Pss by Category:")];
    rows.extend(labelled_totals(FILE_PAGE_TAG, file_page));
    rows.extend(labelled_totals(ANON_PAGE_TAG, anon_page));
    rows.extend(labelled_totals(DMA_TAG, dma));
    rows
}

fn ram_row(title: &str, value: u64) -> ReportRow {
    vec![left(title, RAM_WIDTH), add_kb_unit(value)]
}

/// Total/Free/Used/Lost RAM lines.
pub fn ram_usage_rows(ram: &SystemRam) -> Vec<ReportRow> {
    let mut free = ram_row("Free RAM:", ram.free);
    free.push(format!(
        " ({} cached + {} free)",
        ram.cached_info, ram.free_info
    ));

    let mut used = ram_row("Used RAM:", ram.used);
    used.push(format!(
        " ({} total pss + {} kernel)",
        ram.total_pss, ram.kernel_used
    ));

    vec![
        ram_row("Total RAM:", ram.total),
        free,
        used,
        ram_row("Lost RAM:", ram.lost),
    ]
}

/// Values of the `Total RAM by Category:` section. `None` omits the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RamCategory {
    pub hardware: Option<u64>,
    pub cma: Option<u64>,
    pub kernel: Option<u64>,
    pub processes: u64,
}

/// `Total RAM by Category:` section.
pub fn ram_category_rows(category: &RamCategory) -> Vec<ReportRow> {
    let mut rows = vec![title_row("Total RAM by Category:")];
    if let Some(value) = category.hardware {
        rows.push(ram_row("Hardware Usage:", value));
    }
    if let Some(value) = category.cma {
        rows.push(ram_row("CMA Usage:", value));
    }
    if let Some(value) = category.kernel {
        rows.push(ram_row("Kernel Usage:", value));
    }
    rows.push(ram_row("Processes Usage:", category.processes));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::accumulate_into_group;

    fn usage(pid: u32, pss: u64, swap_pss: u64, vss: u64) -> ProcessUsage {
        ProcessUsage {
            pid,
            name: format!("proc{pid}"),
            pss,
            swap_pss,
            vss,
            ..ProcessUsage::default()
        }
    }

    #[test]
    fn test_memory_title_rows() {
        let rows = memory_title_rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].len(), 8);
        assert_eq!(rows[0][1].trim(), "Pss");
        assert_eq!(rows[1][1].trim(), "Total");
        assert_eq!(rows[2][1].trim(), "( kB )");
        assert_eq!(rows[3][1], "-".repeat(LINE_WIDTH));
    }

    #[test]
    fn test_category_rows_label_other() {
        let mut groups = CategoryMap::new();
        accumulate_into_group("File-backed Page#other", "Pss", 5, &mut groups);
        accumulate_into_group("Anonymous Page#native heap", "Pss", 7, &mut groups);

        let rows = category_rows(&groups);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[4][0].trim(), "native heap");
        assert_eq!(rows[4][1].trim(), "7");
        assert_eq!(rows[5][0].trim(), "FilePage other");
        // Missing fields print as zero
        assert_eq!(rows[5][2].trim(), "0");
    }

    #[test]
    fn test_total_rows() {
        let mut groups = CategoryMap::new();
        accumulate_into_group("Anonymous Page#stack", "Pss", 10, &mut groups);
        accumulate_into_group("Anonymous Page#stack", "SwapPss", 4, &mut groups);
        accumulate_into_group("File-backed Page#.so", "Pss", 20, &mut groups);
        accumulate_into_group("File-backed Page#.so", "Shared_Clean", 3, &mut groups);

        let rows = total_rows(&groups);
        assert_eq!(rows.len(), 2);
        let values: Vec<&str> = rows[1].iter().map(|c| c.trim()).collect();
        assert_eq!(values, vec!["Total", "34", "3", "0", "0", "0", "0", "4"]);
    }

    #[test]
    fn test_sort_process_usages() {
        let mut usages = vec![
            usage(1, 30, 0, 500),
            usage(2, 40, 10, 100),
            usage(3, 50, 0, 200),
            usage(4, 50, 0, 200),
        ];
        sort_process_usages(&mut usages);
        let pids: Vec<u32> = usages.iter().map(|u| u.pid).collect();
        // 50/200 ties fall back to pid descending; 50/100 sorts after them
        assert_eq!(pids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_process_row() {
        let mut u = usage(42, 800, 20, 4096);
        u.name = "my app".into();
        let row = process_row(&u);
        assert_eq!(row[0], "42   ");
        assert_eq!(row[1].trim(), "myapp");
        assert_eq!(row[2], "820(20 in SwapPss) kB");
        assert_eq!(row[3].trim(), "4096 kB");
    }

    #[test]
    fn test_priority_rows_prints_every_bucket() {
        let mut buckets = BTreeMap::new();
        buckets.insert(
            ReclaimPriority::Foreground,
            vec![usage(1, 10, 0, 0), usage(2, 30, 5, 0)],
        );

        let rows = priority_rows(&buckets);
        assert_eq!(rows[0][0], "Total Pss by OOM adjustment:");
        assert_eq!(rows[1][0], "System: 0 kB");
        assert_eq!(rows[2][0], "Foreground: 45 kB");
        assert!(rows[3][0].starts_with("proc2(pid=2): "));
        assert!(rows[3][0].ends_with("35 kB"));
        assert_eq!(rows[3][1], " (5 kB in SwapPss)");
        assert_eq!(rows[4].len(), 1);
        assert_eq!(rows[5][0], "Suspend-delay: 0 kB");
        assert_eq!(rows.len(), 1 + 6 + 2);
    }

    #[test]
    fn test_pss_total_rows() {
        let mut groups = CategoryMap::new();
        accumulate_into_group("File-backed Page#.so", "Pss", 100, &mut groups);
        accumulate_into_group("File-backed Page#.ttf", "Pss", 300, &mut groups);
        accumulate_into_group("Anonymous Page#stack", "Pss", 10, &mut groups);
        accumulate_into_group("Anonymous Page#stack", "SwapPss", 5, &mut groups);

        let rows = pss_total_rows(&groups, 7, 0);
        let text: Vec<String> = rows.iter().map(|r| r.join("")).collect();
        assert_eq!(text[0], "Total Pss by Category:");
        assert_eq!(text[1], "File-backed Page(400 kB):");
        assert!(text[2].ends_with(" : .ttf"));
        assert!(text[3].ends_with(" : .so"));
        assert_eq!(text[4], "Anonymous Page(15 kB):");
        assert_eq!(text[6], "DMA(7 kB):");
        assert_eq!(text[7].trim(), "7 kB : GL");
    }

    #[test]
    fn test_ram_category_omits_missing() {
        let rows = ram_category_rows(&RamCategory {
            hardware: None,
            cma: Some(10),
            kernel: None,
            processes: 99,
        });
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0].trim(), "CMA Usage:");
        assert_eq!(rows[2][1], "99 kB");
    }

    #[test]
    fn test_ram_usage_rows() {
        let ram = SystemRam {
            total: 100,
            free: 45,
            used: 12,
            lost: 3,
            total_pss: 5,
            kernel_used: 7,
            cached_info: 25,
            free_info: 20,
            ..SystemRam::default()
        };
        let rows = ram_usage_rows(&ram);
        assert_eq!(rows[1][2], " (25 cached + 20 free)");
        assert_eq!(rows[2][2], " (5 total pss + 7 kernel)");
        assert_eq!(rows[3][1], "3 kB");
    }
}
