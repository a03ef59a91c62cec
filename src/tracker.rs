//! Tracking session for one save.
//!
//! [`Tracker`] owns all mutable state (history, ignore set, previous
//! snapshot) and exposes it only through `run_cycle` and `toggle_ignore`.
//! [`spawn`] moves it into a single tokio task that interleaves scan cycles
//! and ignore toggles one at a time, and publishes [`TrackerStats`] on a
//! watch channel after every cycle and toggle.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{HoardError, Result};
use crate::scan::collector::{self, SaveLayout};
use crate::scan::Snapshot;
use crate::store::HistoryStore;
use crate::tag::TagReader;
use crate::timeline::{apply_cycle, CycleReport, EventKind, History};

/// What the presentation side gets to see, once per cycle.
#[derive(Debug, Clone)]
pub struct TrackerStats {
    pub collected_count: usize,
    pub total_count: usize,
    pub history: History,
    pub catalog: Arc<Catalog>,
    pub ignored: HashSet<String>,
    /// Items in the most recent snapshot.
    pub present: HashSet<String>,
    pub last_scan_at: Option<i64>,
    pub save_modified_at: Option<i64>,
}

pub struct Tracker {
    catalog: Arc<Catalog>,
    store: HistoryStore,
    history: History,
    ignored: HashSet<String>,
    previous: HashSet<String>,
    gap_threshold_ms: i64,
    last_scan_at: Option<i64>,
    save_modified_at: Option<i64>,
    // set when a flush failed, so the next cycle retries it
    pending_flush: bool,
}

impl Tracker {
    /// Loads persisted history and ignore set for a save.
    pub fn open(catalog: Arc<Catalog>, store: HistoryStore, gap_threshold_ms: i64) -> Result<Self> {
        let history = store.load_history()?;
        let ignored = store.load_ignored()?;
        info!(
            history = history.len(),
            ignored = ignored.len(),
            catalog = catalog.len(),
            path = %store.history_path().display(),
            "tracker opened"
        );

        Ok(Tracker {
            catalog,
            store,
            history,
            ignored,
            previous: HashSet::new(),
            gap_threshold_ms,
            last_scan_at: None,
            save_modified_at: None,
            pending_flush: false,
        })
    }

    /// Applies a snapshot taken at `now` and flushes history if anything
    /// changed state.
    pub fn run_cycle(&mut self, snapshot: Snapshot, now: i64) -> Result<CycleReport> {
        let mut report = apply_cycle(
            &mut self.history,
            &self.catalog,
            &self.previous,
            &snapshot.items,
            now,
            self.gap_threshold_ms,
        );

        self.previous = snapshot.items;
        self.last_scan_at = Some(now);
        if snapshot.newest_modification.is_some() {
            self.save_modified_at = snapshot.newest_modification;
        }

        if report.needs_flush() || self.pending_flush {
            self.pending_flush = true;
            info!(
                discovered = report.count(EventKind::Discovered),
                reacquired = report.count(EventKind::Reacquired),
                vanished = report.count(EventKind::Vanished),
                "saving history"
            );
            self.store.save_history(&self.history)?;
            self.pending_flush = false;
            report.flushed = true;
        }

        Ok(report)
    }

    /// Flips `id` in the ignore set and persists it immediately. Returns
    /// whether the item is now ignored.
    ///
    /// On a failed write the in-memory set is left unchanged.
    pub fn toggle_ignore(&mut self, id: &str) -> Result<bool> {
        let mut ignored = self.ignored.clone();
        let now_ignored = if ignored.remove(id) {
            false
        } else {
            ignored.insert(id.to_string());
            true
        };
        self.store.save_ignored(&ignored)?;
        self.ignored = ignored;
        info!(item = %id, ignored = now_ignored, "ignore toggled");
        Ok(now_ignored)
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            collected_count: self.history.len(),
            total_count: self.catalog.len(),
            history: self.history.clone(),
            catalog: Arc::clone(&self.catalog),
            ignored: self.ignored.clone(),
            present: self.previous.clone(),
            last_scan_at: self.last_scan_at,
            save_modified_at: self.save_modified_at,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn ignored(&self) -> &HashSet<String> {
        &self.ignored
    }
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub save_dir: PathBuf,
    pub layout: SaveLayout,
    pub poll_interval: Duration,
    pub read_timeout: Duration,
}

enum Command {
    ToggleIgnore {
        id: String,
        reply: oneshot::Sender<Result<bool>>,
    },
}

/// Handle to a running tracker task. Dropping it stops the task.
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
    stats: watch::Receiver<Arc<TrackerStats>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Tracker>,
}

impl TrackerHandle {
    pub fn subscribe(&self) -> watch::Receiver<Arc<TrackerStats>> {
        self.stats.clone()
    }

    pub fn latest(&self) -> Arc<TrackerStats> {
        Arc::clone(&self.stats.borrow())
    }

    pub async fn toggle_ignore(&self, id: impl Into<String>) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::ToggleIgnore { id: id.into(), reply })
            .await
            .map_err(|_| HoardError::TrackerStopped)?;
        response.await.map_err(|_| HoardError::TrackerStopped)?
    }

    /// Cancels future cycles and waits for the task to wind down. A cycle
    /// still collecting is abandoned before it touches history.
    pub async fn stop(self) -> Result<Tracker> {
        let _ = self.shutdown.send(true);
        self.task.await.map_err(|_| HoardError::TrackerStopped)
    }
}

/// Starts the periodic scan loop. The first cycle runs immediately.
pub fn spawn(
    tracker: Tracker,
    reader: Arc<dyn TagReader>,
    settings: TrackerSettings,
) -> TrackerHandle {
    let (commands, command_rx) = mpsc::channel(16);
    let (stats_tx, stats) = watch::channel(Arc::new(tracker.stats()));
    let (shutdown, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(run(tracker, reader, settings, command_rx, stats_tx, shutdown_rx));

    TrackerHandle {
        commands,
        stats,
        shutdown,
        task,
    }
}

async fn run(
    mut tracker: Tracker,
    reader: Arc<dyn TagReader>,
    settings: TrackerSettings,
    mut commands: mpsc::Receiver<Command>,
    stats: watch::Sender<Arc<TrackerStats>>,
    mut shutdown: watch::Receiver<bool>,
) -> Tracker {
    let mut ticker = interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        save = %settings.save_dir.display(),
        interval_ms = settings.poll_interval.as_millis() as u64,
        "tracking started"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,

            Some(command) = commands.recv() => match command {
                Command::ToggleIgnore { id, reply } => {
                    let result = tracker.toggle_ignore(&id);
                    if let Err(e) = &result {
                        warn!(item = %id, error = %e, "failed to persist ignore list");
                    }
                    stats.send_replace(Arc::new(tracker.stats()));
                    let _ = reply.send(result);
                }
            },

            _ = ticker.tick() => {
                let snapshot = tokio::select! {
                    snapshot = collector::collect(
                        &settings.save_dir,
                        &settings.layout,
                        Arc::clone(&reader),
                        settings.read_timeout,
                    ) => snapshot,
                    _ = shutdown.changed() => {
                        debug!("stop requested mid-scan, abandoning cycle");
                        break;
                    }
                };
                if *shutdown.borrow() {
                    debug!("stop requested after scan, abandoning cycle");
                    break;
                }

                let now = chrono::Utc::now().timestamp_millis();
                match tracker.run_cycle(snapshot, now) {
                    Ok(report) => debug!(
                        events = report.events.len(),
                        flushed = report.flushed,
                        "cycle complete"
                    ),
                    Err(e) => warn!(error = %e, "cycle failed, will retry"),
                }

                if let Some(usage) = memory_stats::memory_stats() {
                    debug!(rss_bytes = usage.physical_mem, "memory after cycle");
                }

                stats.send_replace(Arc::new(tracker.stats()));
            }
        }
    }

    info!("tracking stopped");
    tracker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Timeline, GAP_THRESHOLD_MS};
    use tempfile::TempDir;

    fn catalog() -> Arc<Catalog> {
        Arc::new(["a", "b", "c"].into_iter().map(String::from).collect())
    }

    fn snapshot(ids: &[&str]) -> Snapshot {
        Snapshot {
            items: ids.iter().map(|s| s.to_string()).collect(),
            ..Snapshot::default()
        }
    }

    fn open(dir: &TempDir) -> Tracker {
        Tracker::open(catalog(), HistoryStore::for_save(dir.path()), GAP_THRESHOLD_MS).unwrap()
    }

    #[test]
    fn flush_only_on_events() {
        let dir = TempDir::new().unwrap();
        let mut tracker = open(&dir);

        assert!(tracker.run_cycle(snapshot(&["a"]), 0).unwrap().flushed);
        assert!(!tracker.run_cycle(snapshot(&["a"]), 5_000).unwrap().flushed);
        assert!(!tracker.run_cycle(snapshot(&["a"]), 10_000).unwrap().flushed);
        assert!(tracker.run_cycle(snapshot(&[]), 15_000).unwrap().flushed);
        assert!(!tracker.run_cycle(snapshot(&[]), 20_000).unwrap().flushed);
    }

    #[test]
    fn vanish_flush_persists_last_observed_time() {
        let dir = TempDir::new().unwrap();
        let mut tracker = open(&dir);

        tracker.run_cycle(snapshot(&["a"]), 0).unwrap();
        tracker.run_cycle(snapshot(&["a"]), 5_000).unwrap();

        // before the vanish, disk still holds the first observation
        let on_disk = HistoryStore::for_save(dir.path()).load_history().unwrap();
        assert_eq!(on_disk["a"], Timeline::new(0));

        tracker.run_cycle(snapshot(&[]), 10_000).unwrap();
        let on_disk = HistoryStore::for_save(dir.path()).load_history().unwrap();
        assert_eq!(
            on_disk["a"],
            Timeline {
                first_seen: 0,
                last_seen: 5_000
            }
        );
    }

    #[test]
    fn history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let mut tracker = open(&dir);
        tracker.run_cycle(snapshot(&["a", "b", "outside"]), 100).unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.history().len(), 2);
        assert!(!reopened.history().contains_key("outside"));
    }

    #[test]
    fn toggle_flips_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut tracker = open(&dir);

        assert!(tracker.toggle_ignore("c").unwrap());
        assert!(open(&dir).ignored().contains("c"));

        assert!(!tracker.toggle_ignore("c").unwrap());
        assert!(open(&dir).ignored().is_empty());
    }

    #[test]
    fn stats_reflect_state() {
        let dir = TempDir::new().unwrap();
        let mut tracker = open(&dir);
        let mut snap = snapshot(&["a"]);
        snap.newest_modification = Some(42);
        tracker.run_cycle(snap, 1_000).unwrap();
        tracker.toggle_ignore("b").unwrap();

        let stats = tracker.stats();
        assert_eq!(stats.collected_count, 1);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.last_scan_at, Some(1_000));
        assert_eq!(stats.save_modified_at, Some(42));
        assert!(stats.ignored.contains("b"));
        assert!(stats.present.contains("a"));
    }

    #[test]
    fn failed_flush_is_retried_next_cycle() {
        let dir = TempDir::new().unwrap();
        // history path points into a regular file, so the first save fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = HistoryStore::new(blocker.join("history.txt"), dir.path().join("ignored.txt"));
        let mut tracker = Tracker::open(catalog(), store, GAP_THRESHOLD_MS).unwrap();

        assert!(tracker.run_cycle(snapshot(&["a"]), 0).is_err());

        std::fs::remove_file(&blocker).unwrap();
        let report = tracker.run_cycle(snapshot(&["a"]), 5_000).unwrap();
        assert!(report.events.is_empty());
        assert!(report.flushed);
    }

    #[test]
    fn failed_toggle_leaves_ignore_set_unchanged() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = HistoryStore::new(dir.path().join("history.txt"), blocker.join("ignored.txt"));
        let mut tracker = Tracker::open(catalog(), store, GAP_THRESHOLD_MS).unwrap();

        assert!(tracker.toggle_ignore("a").is_err());
        assert!(tracker.ignored().is_empty());
        assert!(tracker.stats().ignored.is_empty());

        std::fs::remove_file(&blocker).unwrap();
        assert!(tracker.toggle_ignore("a").unwrap());
        assert!(tracker.ignored().contains("a"));
    }

    /// Sleeps on every file read.
    struct SlowReader(Duration);

    impl TagReader for SlowReader {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn read(&self, bytes: &[u8]) -> Result<crate::tag::Tag> {
            std::thread::sleep(self.0);
            crate::tag::JsonReader.read(bytes)
        }
    }

    fn settings(dir: &TempDir) -> TrackerSettings {
        TrackerSettings {
            save_dir: dir.path().to_path_buf(),
            layout: SaveLayout::default(),
            poll_interval: Duration::from_millis(50),
            read_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn spawned_tracker_broadcasts_and_toggles() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("level.dat"),
            r#"{"Data": {"Player": {"Inventory": [{"id": "a"}]}}}"#,
        )
        .unwrap();

        let handle = spawn(open(&dir), Arc::new(crate::tag::JsonReader), settings(&dir));
        let mut rx = handle.subscribe();
        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.last_scan_at.is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert!(stats.history.contains_key("a"));

        assert!(handle.toggle_ignore("b").await.unwrap());
        assert!(handle.latest().ignored.contains("b"));

        let tracker = handle.stop().await.unwrap();
        assert!(tracker.ignored().contains("b"));
    }

    #[tokio::test]
    async fn toggle_after_stop_reports_stopped() {
        let dir = TempDir::new().unwrap();
        let handle = spawn(open(&dir), Arc::new(crate::tag::JsonReader), settings(&dir));
        let commands = handle.commands.clone();
        handle.stop().await.unwrap();

        let (reply, _rx) = oneshot::channel();
        let sent = commands
            .send(Command::ToggleIgnore { id: "a".into(), reply })
            .await;
        assert!(sent.is_err());
    }

    #[tokio::test]
    async fn stop_during_collection_abandons_cycle() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("level.dat"), r#"{"Inventory": [{"id": "a"}]}"#).unwrap();

        let reader = Arc::new(SlowReader(Duration::from_millis(800)));
        let handle = spawn(open(&dir), reader, settings(&dir));
        tokio::time::sleep(Duration::from_millis(100)).await;

        let tracker = handle.stop().await.unwrap();
        assert_eq!(tracker.stats().last_scan_at, None);
        assert!(tracker.history().is_empty());
        assert!(!dir.path().join(crate::store::HISTORY_FILE).exists());
    }
}
