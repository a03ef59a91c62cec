//! History store.
//!
//! Two line-oriented files live next to the save they describe:
//! - history: `identifier|firstSeenEpochMillis|lastSeenEpochMillis`
//! - ignored: one identifier per line
//!
//! Both are rewritten whole on every save, through a temp file in the same
//! directory that is renamed over the target. Loading tolerates a missing
//! file and skips malformed lines.

use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{HoardError, Result};
use crate::timeline::{History, Timeline};

pub const HISTORY_FILE: &str = "hoard_history.txt";
pub const IGNORE_FILE: &str = "hoard_ignored.txt";

#[derive(Debug, Clone)]
pub struct HistoryStore {
    history_path: PathBuf,
    ignore_path: PathBuf,
}

impl HistoryStore {
    /// Store files kept inside the save directory itself.
    pub fn for_save(save_dir: &Path) -> Self {
        HistoryStore::new(save_dir.join(HISTORY_FILE), save_dir.join(IGNORE_FILE))
    }

    pub fn new(history_path: PathBuf, ignore_path: PathBuf) -> Self {
        HistoryStore {
            history_path,
            ignore_path,
        }
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn load_history(&self) -> Result<History> {
        let Some(raw) = read_optional(&self.history_path)? else {
            return Ok(History::new());
        };

        let mut history = History::new();
        let mut skipped = 0usize;
        for line in raw.split(|b| *b == b'\n') {
            let Ok(line) = std::str::from_utf8(line) else {
                skipped += 1;
                continue;
            };
            match parse_history_line(line) {
                Some((id, timeline)) => {
                    history.insert(id.to_string(), timeline);
                }
                None if line.trim().is_empty() => {}
                None => skipped += 1,
            }
        }

        debug!(
            path = %self.history_path.display(),
            entries = history.len(),
            skipped,
            "history loaded"
        );
        Ok(history)
    }

    pub fn save_history(&self, history: &History) -> Result<()> {
        let mut entries: Vec<_> = history.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        write_atomic(&self.history_path, |out| {
            for (id, timeline) in entries {
                writeln!(out, "{id}|{}|{}", timeline.first_seen, timeline.last_seen)?;
            }
            Ok(())
        })?;

        debug!(path = %self.history_path.display(), entries = history.len(), "history saved");
        Ok(())
    }

    pub fn load_ignored(&self) -> Result<HashSet<String>> {
        let Some(raw) = read_optional(&self.ignore_path)? else {
            return Ok(HashSet::new());
        };

        let mut ignored = HashSet::new();
        let mut skipped = 0usize;
        for line in raw.split(|b| *b == b'\n') {
            match std::str::from_utf8(line) {
                Ok(line) if !line.trim().is_empty() => {
                    ignored.insert(line.trim().to_string());
                }
                Ok(_) => {}
                Err(_) => skipped += 1,
            }
        }

        debug!(
            path = %self.ignore_path.display(),
            entries = ignored.len(),
            skipped,
            "ignore list loaded"
        );
        Ok(ignored)
    }

    pub fn save_ignored(&self, ignored: &HashSet<String>) -> Result<()> {
        let mut ids: Vec<&String> = ignored.iter().collect();
        ids.sort_unstable();

        write_atomic(&self.ignore_path, |out| {
            for id in ids {
                writeln!(out, "{id}")?;
            }
            Ok(())
        })
    }
}

fn parse_history_line(line: &str) -> Option<(&str, Timeline)> {
    let mut parts = line.trim_end_matches('\r').split('|');
    let id = parts.next().filter(|id| !id.is_empty())?;
    let first_seen = parts.next()?.trim().parse().ok()?;
    let last_seen = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((
        id,
        Timeline {
            first_seen,
            last_seen,
        },
    ))
}

/// Raw bytes, so one undecodable line can be skipped without losing the rest.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HoardError::io(path, e)),
    }
}

fn write_atomic(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<&mut NamedTempFile>) -> std::io::Result<()>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| HoardError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| HoardError::io(dir, e))?;
    {
        let mut out = BufWriter::new(&mut tmp);
        body(&mut out)
            .and_then(|_| out.flush())
            .map_err(|e| HoardError::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| HoardError::io(path, e))?;
    tmp.persist(path).map_err(|e| HoardError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> HistoryStore {
        HistoryStore::for_save(dir.path())
    }

    fn timeline(first_seen: i64, last_seen: i64) -> Timeline {
        Timeline {
            first_seen,
            last_seen,
        }
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load_history().unwrap().is_empty());
        assert!(store(&dir).load_ignored().unwrap().is_empty());
    }

    #[test]
    fn history_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut history = History::new();
        history.insert(
            "minecraft:stone".into(),
            Timeline {
                first_seen: 10,
                last_seen: 20,
            },
        );
        history.insert(
            "minecraft:apple".into(),
            Timeline {
                first_seen: 1_700_000_000_000,
                last_seen: 1_700_000_005_000,
            },
        );

        store(&dir).save_history(&history).unwrap();
        assert_eq!(store(&dir).load_history().unwrap(), history);
    }

    #[test]
    fn history_file_is_sorted_pipe_lines() {
        let dir = TempDir::new().unwrap();
        let mut history = History::new();
        history.insert("b".into(), Timeline::new(3));
        history.insert("a".into(), Timeline::new(1));

        store(&dir).save_history(&history).unwrap();
        let raw = fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        assert_eq!(raw, "a|1|1\nb|3|3\n");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(HISTORY_FILE),
            "good|1|2\nbad|x|2\n|1|2\ntoo|1|2|3\nshort|1\n\nwindows|5|6\r\n",
        )
        .unwrap();

        let history = store(&dir).load_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history["good"], timeline(1, 2));
        assert_eq!(history["windows"], timeline(5, 6));
    }

    #[test]
    fn undecodable_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(HISTORY_FILE),
            b"good|1|2\nbad\xff\xfe|3|4\nalso_good|5|6\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(IGNORE_FILE),
            b"minecraft:barrier\n\xc3\x28\nminecraft:bedrock\n",
        )
        .unwrap();

        let history = store(&dir).load_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history["also_good"], timeline(5, 6));

        let ignored = store(&dir).load_ignored().unwrap();
        assert_eq!(ignored.len(), 2);
        assert!(ignored.contains("minecraft:bedrock"));
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let mut history = History::new();
        history.insert("a".into(), Timeline::new(1));
        store(&dir).save_history(&history).unwrap();

        history.clear();
        history.insert("b".into(), Timeline::new(2));
        store(&dir).save_history(&history).unwrap();

        let loaded = store(&dir).load_history().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("b"));
    }

    #[test]
    fn ignored_round_trip() {
        let dir = TempDir::new().unwrap();
        let ignored: HashSet<String> = ["minecraft:bedrock", "minecraft:barrier"]
            .into_iter()
            .map(String::from)
            .collect();

        store(&dir).save_ignored(&ignored).unwrap();
        assert_eq!(store(&dir).load_ignored().unwrap(), ignored);
        assert_eq!(
            fs::read_to_string(dir.path().join(IGNORE_FILE)).unwrap(),
            "minecraft:barrier\nminecraft:bedrock\n"
        );
    }

    #[test]
    fn save_creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(
            dir.path().join("nested/h.txt"),
            dir.path().join("nested/i.txt"),
        );
        store.save_history(&History::new()).unwrap();
        assert!(dir.path().join("nested/h.txt").exists());
    }
}
