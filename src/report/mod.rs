pub mod json;
pub mod table;

use serde::Serialize;

use crate::timeline::Timeline;
use crate::tracker::TrackerStats;

/// Past this, the save on disk is probably stale and the game needs a save.
pub const STALE_SAVE_MS: i64 = 300_000;

/// How recently an item must have been seen to count as held right now.
pub const HELD_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Collected,
    Ignored,
    Missing,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Collected => "COLLECTED",
            ItemStatus::Ignored => "IGNORED",
            ItemStatus::Missing => "MISSING",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub id: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    pub held: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub search: Option<String>,
    pub missing_only: bool,
}

impl Filter {
    fn matches(&self, row: &Row) -> bool {
        if self.missing_only && row.status != ItemStatus::Missing {
            return false;
        }
        match &self.search {
            Some(text) => row.id.to_lowercase().contains(&text.to_lowercase()),
            None => true,
        }
    }
}

/// One row per catalog item, sorted by id. A recorded item counts as
/// collected even if it is also ignored.
pub fn rows(stats: &TrackerStats, filter: &Filter, now: i64) -> Vec<Row> {
    stats
        .catalog
        .sorted()
        .into_iter()
        .map(|id| {
            let timeline = stats.history.get(id).copied();
            let status = if timeline.is_some() {
                ItemStatus::Collected
            } else if stats.ignored.contains(id) {
                ItemStatus::Ignored
            } else {
                ItemStatus::Missing
            };
            Row {
                id: id.to_string(),
                status,
                held: timeline.is_some_and(|t| now.saturating_sub(t.last_seen) < HELD_WINDOW_MS),
                timeline,
            }
        })
        .filter(|row| filter.matches(row))
        .collect()
}

/// "Progress: 12 / 1300 (0.92%)"
pub fn progress_line(stats: &TrackerStats) -> String {
    format!(
        "Progress: {} / {} ({:.2}%)",
        stats.collected_count,
        stats.total_count,
        crate::util::percent(stats.collected_count, stats.total_count)
    )
}

/// Age of the newest scanned save file, with a hint when it looks stale.
pub fn save_age_line(stats: &TrackerStats, now: i64) -> Option<String> {
    let modified = stats.save_modified_at?;
    let age = crate::util::format_ago(now, modified);
    if now.saturating_sub(modified) > STALE_SAVE_MS {
        Some(format!("Save file modified: {age} (try /save-all)"))
    } else {
        Some(format!("Save file modified: {age}"))
    }
}
