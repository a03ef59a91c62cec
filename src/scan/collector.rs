//! Snapshot collector.
//!
//! A save is one primary world file plus a directory of per-player files.
//! Each file is read on the blocking pool with a time bound, so a file the
//! game is halfway through rewriting costs at most one skipped file for one
//! cycle.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{scan_file, Snapshot};
use crate::error::Result;
use crate::tag::TagReader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveLayout {
    pub primary: String,
    pub player_dir: String,
    pub extension: String,
}

impl Default for SaveLayout {
    fn default() -> Self {
        SaveLayout {
            primary: "level.dat".to_string(),
            player_dir: "playerdata".to_string(),
            extension: "dat".to_string(),
        }
    }
}

impl SaveLayout {
    /// Files belonging to a save, primary file first. Missing pieces are
    /// simply absent from the list.
    pub fn source_files(&self, save_dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let primary = save_dir.join(&self.primary);
        if primary.is_file() {
            files.push(primary);
        }

        let player_dir = save_dir.join(&self.player_dir);
        if !player_dir.is_dir() {
            return files;
        }

        let mut players: Vec<PathBuf> = WalkDir::new(&player_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == self.extension)
            })
            .map(|e| e.into_path())
            .collect();
        players.sort();
        files.extend(players);

        files
    }
}

/// Scans every source file of a save and unions what was found.
///
/// Never fails: unreadable files are logged and skipped, and a missing save
/// directory yields an empty snapshot.
pub async fn collect(
    save_dir: &Path,
    layout: &SaveLayout,
    reader: Arc<dyn TagReader>,
    read_timeout: Duration,
) -> Snapshot {
    let mut snapshot = Snapshot::empty();

    if !save_dir.is_dir() {
        debug!(save = %save_dir.display(), "save directory missing, empty snapshot");
        return snapshot;
    }

    let files = layout.source_files(save_dir);
    debug!(save = %save_dir.display(), files = files.len(), format = reader.name(), "collecting");

    for path in files {
        let reader = Arc::clone(&reader);
        let task_path = path.clone();
        let task = tokio::task::spawn_blocking(move || read_source(&task_path, reader.as_ref()));

        match tokio::time::timeout(read_timeout, task).await {
            Ok(Ok(Ok((items, modified)))) => {
                debug!(file = %path.display(), items = items.len(), "scanned");
                snapshot.merge(items, modified);
            }
            Ok(Ok(Err(e))) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable file this cycle");
                snapshot.files_skipped += 1;
            }
            Ok(Err(e)) => {
                warn!(file = %path.display(), error = %e, "reader task failed");
                snapshot.files_skipped += 1;
            }
            Err(_) => {
                warn!(
                    file = %path.display(),
                    timeout_ms = read_timeout.as_millis() as u64,
                    "read timed out, skipping this cycle"
                );
                snapshot.files_skipped += 1;
            }
        }
    }

    snapshot
}

fn read_source(path: &Path, reader: &dyn TagReader) -> Result<(HashSet<String>, Option<i64>)> {
    let items = scan_file(path, reader)?;
    Ok((items, modified_millis(path)))
}

fn modified_millis(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let elapsed = modified.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(elapsed.as_millis()).ok()
}
