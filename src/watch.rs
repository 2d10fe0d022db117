//! Watch Mode
//!
//! Keeps a persisted hashtree in step with a directory while it changes.
//! Filesystem events arrive from `notify` on a channel and are consumed on
//! the calling thread: creations and modifications go through the
//! single-path generated update, removals through the deleted update. The
//! tree is saved after each processed batch.

use crate::error::{Stage, SyncError, TreeError};
use crate::pipeline::SyncSettings;
use crate::tree::{path, HashedFileTree, TreeActualizer};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Watch mode configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory mirrored by the tree
    pub root: PathBuf,
    /// Where the tree is persisted
    pub storage_dir: PathBuf,
    /// Storage prefix of the tree
    pub prefix: String,
    /// Quiet period after the last event before a batch is processed
    pub batch_window_ms: u64,
    pub settings: SyncSettings,
}

impl WatchConfig {
    pub fn new(root: impl Into<PathBuf>, storage_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            storage_dir: storage_dir.into(),
            prefix: prefix.into(),
            batch_window_ms: 200,
            settings: SyncSettings::default(),
        }
    }
}

/// Filesystem change event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

impl ChangeEvent {
    /// Convert a notify event; access and other metadata-free events yield `None`
    pub fn from_notify(event: &Event) -> Option<Self> {
        let first = event.paths.first()?.clone();
        match event.kind {
            EventKind::Create(_) => Some(ChangeEvent::Created(first)),
            EventKind::Modify(notify::event::ModifyKind::Name(_)) => match event.paths.get(1) {
                Some(to) => Some(ChangeEvent::Renamed {
                    from: first,
                    to: to.clone(),
                }),
                // One-sided rename: re-check whatever is there now
                None => Some(ChangeEvent::Modified(first)),
            },
            EventKind::Modify(_) => Some(ChangeEvent::Modified(first)),
            EventKind::Remove(_) => Some(ChangeEvent::Removed(first)),
            _ => None,
        }
    }

    fn key(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Removed(p) => p,
            ChangeEvent::Renamed { to, .. } => to,
        }
    }
}

/// Coalesces events per path until the batch is taken; the latest event wins
#[derive(Debug, Default)]
struct EventBatcher {
    pending: BTreeMap<PathBuf, ChangeEvent>,
}

impl EventBatcher {
    fn add_event(&mut self, event: ChangeEvent) {
        if let ChangeEvent::Renamed { from, .. } = &event {
            self.pending
                .insert(from.clone(), ChangeEvent::Removed(from.clone()));
        }
        self.pending.insert(event.key().to_path_buf(), event);
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take_batch(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.pending).into_values().collect()
    }
}

/// Holds the watched tree and applies events to it
pub struct WatchDaemon {
    root: PathBuf,
    storage_dir: PathBuf,
    batch_window: Duration,
    tree: HashedFileTree,
    actualizer: TreeActualizer,
}

impl WatchDaemon {
    /// Load the stored tree and bring it up to date with a full actualization
    pub fn new(config: WatchConfig) -> Result<Self, SyncError> {
        let at = SyncError::at(Stage::Actualize);
        let root = dunce::canonicalize(&config.root)
            .map_err(|e| at(TreeError::io(&config.root, e)))?;
        fs::create_dir_all(&config.storage_dir)?;
        let storage_dir = dunce::canonicalize(&config.storage_dir)?;

        let mut tree = config
            .settings
            .load_tree(&storage_dir, &config.prefix)
            .map_err(at)?;
        let actualizer = config.settings.actualizer();
        info!(root = %root.display(), "Building initial tree");
        actualizer.actualize(&mut tree, &root).map_err(at)?;
        tree.save().map_err(at)?;

        Ok(Self {
            root,
            storage_dir,
            batch_window: Duration::from_millis(config.batch_window_ms),
            tree,
            actualizer,
        })
    }

    pub fn tree(&self) -> &HashedFileTree {
        &self.tree
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(&self, file: &Path) -> Option<String> {
        if file.starts_with(&self.storage_dir) {
            return None;
        }
        path::relative_to(&self.root, file)
    }

    /// Apply one event to the tree. Returns whether the tree changed.
    pub fn apply_event(&mut self, event: &ChangeEvent) -> Result<bool, TreeError> {
        match event {
            ChangeEvent::Created(file) | ChangeEvent::Modified(file) => self.generated(file),
            ChangeEvent::Removed(file) => self.deleted(file),
            ChangeEvent::Renamed { from, to } => {
                let removed = self.deleted(from)?;
                let added = self.generated(to)?;
                Ok(removed || added)
            }
        }
    }

    fn generated(&mut self, file: &Path) -> Result<bool, TreeError> {
        match self.relative(file) {
            Some(relative) => self
                .actualizer
                .actualize_when_single_file_generated(&mut self.tree, &self.root, &relative),
            None => Ok(false),
        }
    }

    fn deleted(&mut self, file: &Path) -> Result<bool, TreeError> {
        match self.relative(file) {
            Some(relative) => self
                .actualizer
                .actualize_when_single_file_deleted(&mut self.tree, &self.root, &relative),
            None => Ok(false),
        }
    }

    /// Apply a batch and save the tree if anything changed.
    /// Returns the number of events that changed the tree.
    pub fn process_events(&mut self, events: Vec<ChangeEvent>) -> Result<usize, SyncError> {
        let mut changed = 0;
        for event in &events {
            match self.apply_event(event) {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => error!(event = ?event, error = %e, "Failed to apply change event"),
            }
        }

        if changed > 0 {
            self.tree.save().map_err(SyncError::at(Stage::Actualize))?;
            info!(
                events = events.len(),
                changed,
                root_hash = %self.tree.get_hash(path::ROOT).unwrap_or_default(),
                "Hashtree updated"
            );
        }
        Ok(changed)
    }

    /// Watch until `stop` is set or the event channel closes
    pub fn run(&mut self, stop: Arc<AtomicBool>) -> Result<(), SyncError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(root = %self.root.display(), "Watching directory");

        let mut batcher = EventBatcher::default();
        let mut last_event = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            match rx.recv_timeout(self.batch_window) {
                Ok(Ok(event)) => {
                    if let Some(change) = ChangeEvent::from_notify(&event) {
                        debug!(event = ?change, "Received change event");
                        batcher.add_event(change);
                        last_event = Instant::now();
                    }
                }
                Ok(Err(e)) => warn!("Watch error: {}", e),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
            }

            if !batcher.is_empty() && last_event.elapsed() >= self.batch_window {
                self.process_events(batcher.take_batch())?;
            }
        }

        if !batcher.is_empty() {
            self.process_events(batcher.take_batch())?;
        }
        Ok(())
    }
}

/// Actualize `dir` into `storage_dir` and keep it current until `stop` is set
pub fn run(
    dir: &Path,
    storage_dir: &Path,
    prefix: &str,
    settings: SyncSettings,
    stop: Arc<AtomicBool>,
) -> Result<(), SyncError> {
    let mut config = WatchConfig::new(dir, storage_dir, prefix);
    config.settings = settings;
    WatchDaemon::new(config)?.run(stop)
}
