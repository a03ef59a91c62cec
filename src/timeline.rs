//! Timeline engine.
//!
//! Turns consecutive snapshots into first-seen / last-seen history and
//! decides whether a cycle is worth a disk write:
//! - Discovered: a catalog item with no history is present
//! - Reacquired: a known item is present again after more than the gap threshold
//! - Vanished: an item present last cycle is absent now
//!
//! Only these events force a flush. A `last_seen` bump on its own stays in
//! memory until the next event writes it out.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Catalog;

/// Absences longer than this reset `first_seen` on return.
pub const GAP_THRESHOLD_MS: i64 = 15_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub first_seen: i64,
    pub last_seen: i64,
}

impl Timeline {
    pub fn new(now: i64) -> Self {
        Timeline {
            first_seen: now,
            last_seen: now,
        }
    }
}

pub type History = HashMap<String, Timeline>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    Discovered,
    Reacquired,
    Vanished,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Discovered => "discovered",
            EventKind::Reacquired => "reacquired",
            EventKind::Vanished => "vanished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub id: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub events: Vec<TimelineEvent>,
    pub now: i64,
    pub flushed: bool,
}

impl CycleReport {
    pub fn needs_flush(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

/// Derived per-item state; nothing stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    Unseen,
    Present,
    Historical,
}

pub fn item_state(id: &str, history: &History, current: &HashSet<String>) -> ItemState {
    if current.contains(id) {
        ItemState::Present
    } else if history.contains_key(id) {
        ItemState::Historical
    } else {
        ItemState::Unseen
    }
}

/// Applies one scan cycle to `history`.
///
/// Vanished items are reported but their timelines are left alone: their
/// `last_seen` was already bumped on the cycle they were last present, and
/// the event exists so that value gets flushed.
pub fn apply_cycle(
    history: &mut History,
    catalog: &Catalog,
    previous: &HashSet<String>,
    current: &HashSet<String>,
    now: i64,
    gap_threshold_ms: i64,
) -> CycleReport {
    let mut events = Vec::new();

    for id in current {
        if !catalog.contains(id) {
            continue;
        }

        match history.get_mut(id) {
            None => {
                history.insert(id.clone(), Timeline::new(now));
                info!(item = %id, "new item found");
                events.push(TimelineEvent {
                    id: id.clone(),
                    kind: EventKind::Discovered,
                });
            }
            Some(timeline) => {
                let gap = now.saturating_sub(timeline.last_seen);
                timeline.last_seen = now;

                if gap > gap_threshold_ms {
                    timeline.first_seen = now;
                    info!(item = %id, absent_ms = gap, "item returned");
                    events.push(TimelineEvent {
                        id: id.clone(),
                        kind: EventKind::Reacquired,
                    });
                }
            }
        }
    }

    for id in previous.difference(current) {
        info!(item = %id, "item disappeared");
        events.push(TimelineEvent {
            id: id.clone(),
            kind: EventKind::Vanished,
        });
    }

    CycleReport {
        events,
        now,
        flushed: false,
    }
}
