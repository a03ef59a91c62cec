//! Container-tree scanner.
//!
//! Pulls every item identifier out of a parsed save tree, following the
//! nesting shapes items use to hold other items:
//! - `tag.BlockEntityTag.Items` (boxes placed back into an inventory)
//! - `tag.Items` (older bundles and mod containers)
//! - every value under `components` that is a list, or a compound with `Items`
//! - slot wrappers `{slot, item: {...}}` used by container components

pub mod collector;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::tag::{Tag, TagReader};

/// Nested inventories deeper than this are not descended into.
pub const MAX_DEPTH: usize = 64;

/// Where a root inventory may live, relative to the file's root compound.
const INVENTORY_ROOTS: &[&[&str]] = &[&["Inventory"], &["Data", "Player", "Inventory"]];

/// Items observed in one scan cycle, unioned over every source file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub items: HashSet<String>,
    /// Newest modification time of the files that were read, epoch millis.
    pub newest_modification: Option<i64>,
    pub files_scanned: usize,
    pub files_skipped: usize,
}

impl Snapshot {
    pub fn empty() -> Self {
        Snapshot::default()
    }

    fn merge(&mut self, items: HashSet<String>, modified: Option<i64>) {
        self.items.extend(items);
        self.newest_modification = self.newest_modification.max(modified);
        self.files_scanned += 1;
    }
}

/// Extracts every item identifier reachable from a save file's root.
pub fn extract_items(root: &Tag) -> HashSet<String> {
    let mut walker = Walker::default();

    for keys in INVENTORY_ROOTS {
        if let Some(list) = root.path(keys).and_then(Tag::as_list) {
            walker.inventory(list, 0);
        }
    }

    if walker.truncated {
        warn!(
            max_depth = MAX_DEPTH,
            found = walker.found.len(),
            "inventory nesting exceeds depth cap, deeper containers skipped"
        );
    }

    walker.found
}

/// Reads and scans a single file.
pub fn scan_file(path: &Path, reader: &dyn TagReader) -> Result<HashSet<String>> {
    let root = reader.read_file(path)?;
    Ok(extract_items(&root))
}

#[derive(Default)]
struct Walker {
    found: HashSet<String>,
    truncated: bool,
}

impl Walker {
    fn inventory(&mut self, entries: &[Tag], depth: usize) {
        if depth >= MAX_DEPTH {
            self.truncated = true;
            return;
        }

        for entry in entries {
            if matches!(entry, Tag::Compound(_)) {
                self.item(entry, depth);
            }
        }
    }

    fn item(&mut self, entry: &Tag, depth: usize) {
        if let Some(id) = entry.get("id").and_then(Tag::as_str) {
            if !id.is_empty() {
                self.found.insert(id.to_string());
            }
        }

        if let Some(tag) = entry.get("tag") {
            if let Some(items) = tag.path(&["BlockEntityTag", "Items"]).and_then(Tag::as_list) {
                self.inventory(items, depth + 1);
            }
            if let Some(items) = tag.get("Items").and_then(Tag::as_list) {
                self.inventory(items, depth + 1);
            }
        }

        // any component may hold items, so sweep all of them rather than
        // keeping a list of known container keys
        if let Some(components) = entry.get("components").and_then(Tag::as_compound) {
            for value in components.values() {
                match value {
                    Tag::List(items) => self.inventory(items, depth + 1),
                    Tag::Compound(_) => {
                        if let Some(items) = value.get("Items").and_then(Tag::as_list) {
                            self.inventory(items, depth + 1);
                        }
                    }
                    Tag::Scalar(_) => {}
                }
            }
        }

        // a slot wrapper is not a container of its own
        if let Some(inner) = entry.get("item").filter(|t| matches!(t, Tag::Compound(_))) {
            self.item(inner, depth);
        }
    }
}
