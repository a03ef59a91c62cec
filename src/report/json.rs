//! JSON output for reports and one-shot scans.
//!
//! Serializes report rows and snapshots for scripting and piping.

use serde::Serialize;

use super::Row;
use crate::scan::Snapshot;
use crate::tracker::TrackerStats;

#[derive(Serialize)]
struct ReportView<'a> {
    collected: usize,
    total: usize,
    last_scan_at: Option<i64>,
    save_modified_at: Option<i64>,
    items: &'a [Row],
}

pub fn render(stats: &TrackerStats, rows: &[Row]) -> String {
    let view = ReportView {
        collected: stats.collected_count,
        total: stats.total_count,
        last_scan_at: stats.last_scan_at,
        save_modified_at: stats.save_modified_at,
        items: rows,
    };
    serde_json::to_string_pretty(&view).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

#[derive(Serialize)]
struct SnapshotView<'a> {
    items: Vec<&'a str>,
    newest_modification: Option<i64>,
    files_scanned: usize,
    files_skipped: usize,
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut items: Vec<&str> = snapshot.items.iter().map(String::as_str).collect();
    items.sort_unstable();

    let view = SnapshotView {
        items,
        newest_modification: snapshot.newest_modification,
        files_scanned: snapshot.files_scanned,
        files_skipped: snapshot.files_skipped,
    };
    serde_json::to_string_pretty(&view).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}
