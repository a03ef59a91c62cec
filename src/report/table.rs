//! Terminal rendering for item history.
//!
//! Formats output as a flat table:
//! - One row per catalog item, sorted by id
//! - Status column plus first/last seen times for collected items
//! - Marks items seen within the last minute as held

use super::{ItemStatus, Row};
use crate::scan::Snapshot;
use crate::util::format_timestamp;

const ID_WIDTH: usize = 40;

pub fn render(rows: &[Row]) -> String {
    if rows.is_empty() {
        return String::from("No matching items.\n");
    }

    let mut output = String::new();

    output.push_str(&format!(
        "{:ID_WIDTH$} {:<10} {:<20} {:<20}\n",
        "ITEM", "STATUS", "FIRST SEEN", "LAST SEEN"
    ));
    output.push_str(&"-".repeat(ID_WIDTH + 53));
    output.push('\n');

    for row in rows {
        let (first, last) = match (&row.status, row.timeline) {
            (ItemStatus::Collected, Some(t)) => {
                let last = if row.held {
                    String::from("in inventory")
                } else {
                    format_timestamp(t.last_seen)
                };
                (format_timestamp(t.first_seen), last)
            }
            _ => (String::from("-"), String::from("-")),
        };

        output.push_str(&format!(
            "{:ID_WIDTH$} {:<10} {:<20} {:<20}\n",
            truncate(&row.id, ID_WIDTH),
            row.status.as_str(),
            first,
            last
        ));
    }

    output
}

/// Items from a single scan, one per line.
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut items: Vec<_> = snapshot.items.iter().collect();
    items.sort();

    let mut output = String::new();
    for item in &items {
        output.push_str(&format!("  {item}\n"));
    }
    output.push_str(&format!(
        "\n{} items from {} files ({} skipped)\n",
        items.len(),
        snapshot.files_scanned,
        snapshot.files_skipped
    ));
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timeline;

    fn row(id: &str, status: ItemStatus, held: bool) -> Row {
        let timeline = (status == ItemStatus::Collected).then_some(Timeline::new(0));
        Row {
            id: id.to_string(),
            status,
            timeline,
            held,
        }
    }

    #[test]
    fn empty_rows() {
        assert_eq!(render(&[]), "No matching items.\n");
    }

    #[test]
    fn held_items_marked() {
        let out = render(&[
            row("minecraft:dirt", ItemStatus::Collected, true),
            row("minecraft:sand", ItemStatus::Missing, false),
        ]);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("COLLECTED") && lines[2].ends_with("in inventory"));
        assert!(lines[3].contains("MISSING"));
    }

    #[test]
    fn long_ids_truncated() {
        let long = "x".repeat(60);
        assert_eq!(truncate(&long, 10), "xxxxxxx...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn snapshot_listing_sorted() {
        let mut snapshot = Snapshot::empty();
        snapshot.items.extend(["minecraft:b".to_string(), "minecraft:a".to_string()]);
        snapshot.files_scanned = 2;
        let out = render_snapshot(&snapshot);
        assert!(out.starts_with("  minecraft:a\n  minecraft:b\n"));
        assert!(out.contains("2 items from 2 files (0 skipped)"));
    }
}
