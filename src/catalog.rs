//! The fixed set of valid item identifiers for a session.
//!
//! Loaded from a registry dump (any JSON document whose object keys include
//! namespaced item ids) or from a plain list with one id per line.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{HoardError, Result};

const NAMESPACE: &str = "minecraft";

/// Never obtainable as an inventory item.
const EXCLUDED: &[&str] = &["minecraft:air", "minecraft:cave_air", "minecraft:void_air"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: HashSet<String>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| HoardError::io(path, e))?;

        let catalog = match serde_json::from_str::<Value>(&raw) {
            Ok(doc) => {
                let mut items = HashSet::new();
                collect_keys(&doc, &mut items);
                Catalog::from_iter(items)
            }
            Err(_) if raw.trim_start().starts_with(['{', '[']) => {
                return Err(HoardError::Catalog {
                    path: path.to_path_buf(),
                    reason: "looks like json but does not parse".to_string(),
                });
            }
            Err(_) => Catalog::from_iter(
                raw.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            ),
        };

        info!(path = %path.display(), items = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Loads the catalog, falling back to an empty one. Tracking still runs
    /// against an empty catalog, it just records nothing.
    pub fn load_or_empty(path: &Path) -> Self {
        let catalog = match Catalog::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "catalog unavailable, nothing will be recorded");
                return Catalog::default();
            }
        };
        if catalog.is_empty() {
            warn!(path = %path.display(), "catalog is empty, nothing will be recorded");
        }
        catalog
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Identifiers in lexical order.
    pub fn sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.iter().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<String> for Catalog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Catalog {
            items: iter
                .into_iter()
                .filter(|id| !EXCLUDED.contains(&id.as_str()))
                .collect(),
        }
    }
}

fn collect_keys(value: &Value, out: &mut HashSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if is_item_key(key) {
                    out.insert(key.clone());
                }
                collect_keys(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_keys(v, out)),
        _ => {}
    }
}

fn is_item_key(key: &str) -> bool {
    let Some((namespace, path)) = key.split_once(':') else {
        return false;
    };
    namespace == NAMESPACE
        && !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(body: &str) -> Result<Catalog> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.txt");
        fs::write(&path, body).unwrap();
        Catalog::load(&path)
    }

    #[test]
    fn registry_dump_keys_are_collected() {
        let catalog = load(
            r#"{"minecraft:item": {"entries": {
                "minecraft:stone": {"protocol_id": 1},
                "minecraft:oak_log": {"protocol_id": 2},
                "minecraft:air": {"protocol_id": 0}
            }}}"#,
        )
        .unwrap();
        assert_eq!(catalog.sorted(), ["minecraft:oak_log", "minecraft:stone"]);
    }

    #[test]
    fn values_are_not_keys() {
        let catalog = load(r#"{"minecraft:stone": "minecraft:dirt"}"#).unwrap();
        assert!(catalog.contains("minecraft:stone"));
        assert!(!catalog.contains("minecraft:dirt"));
    }

    #[test]
    fn other_namespaces_and_odd_keys_skipped() {
        let catalog = load(r#"{"mod:gear": 1, "minecraft:Stone": 2, "minecraft:": 3}"#).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn plain_list_format() {
        let catalog =
            load("# items\nminecraft:apple\n\n  minecraft:bread  \nminecraft:cave_air\n").unwrap();
        assert_eq!(catalog.sorted(), ["minecraft:apple", "minecraft:bread"]);
    }

    #[test]
    fn broken_json_is_an_error() {
        assert!(load(r#"{"minecraft:stone": "#).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_empty() {
        let dir = TempDir::new().unwrap();
        assert!(Catalog::load_or_empty(&dir.path().join("nope.json")).is_empty());
    }
}
