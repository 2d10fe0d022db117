//! Stage functions: actualize → compare → apply against persisted hashtrees
//!
//! Each function is one pipeline stage. Errors leave the stage as
//! [`SyncError`] tagged with the stage that failed; the caller decides whether
//! to abort or carry on with the next tree.

use crate::apply::{self, apply_difference, ApplyReport, DirectoryArchive, EmptyArchive};
use crate::diff::{TreeComparator, TreeDifferenceCollector};
use crate::error::{ArchiveError, Stage, SyncError, TreeError};
use crate::store::StorageBackend;
use crate::tree::{HashAlgorithm, HashedFileTree, LoadStatus, NodeHasher, TreeActualizer, TreeSettings};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Storage prefix of the source tree in [`sync_directories`]
pub const SOURCE_PREFIX: &str = "source";
/// Storage prefix of the target tree in [`sync_directories`]
pub const TARGET_PREFIX: &str = "target";

/// How trees are hashed and persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSettings {
    pub algorithm: HashAlgorithm,
    pub backend: StorageBackend,
    pub tree: TreeSettings,
}

impl SyncSettings {
    pub fn actualizer(&self) -> TreeActualizer {
        TreeActualizer::new(NodeHasher::with_algorithm(self.algorithm))
    }

    /// Open and load the tree stored under `prefix`; missing storage yields a fresh tree
    pub fn load_tree(&self, storage_dir: &Path, prefix: &str) -> Result<HashedFileTree, TreeError> {
        let mut tree = HashedFileTree::open(storage_dir, prefix, self.backend, self.tree)?;
        if tree.load()? == LoadStatus::NotFound {
            debug!(
                storage = %storage_dir.display(),
                prefix,
                "Hashtree storage is missing and will be created at saving"
            );
        }
        Ok(tree)
    }
}

/// Result of one actualization stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActualizeSummary {
    /// Whether the root hash differs from the persisted one
    pub root_changed: bool,
    pub root_hash: String,
    pub nodes: usize,
    pub directories: usize,
}

/// Result of [`sync_directories`]
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub difference: TreeDifferenceCollector,
    pub report: ApplyReport,
    pub target: ActualizeSummary,
}

fn seconds(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

/// Bring the tree stored under `prefix` in line with `actual_dir` and save it
#[instrument(skip(settings), fields(actual = %actual_dir.display(), storage = %storage_dir.display()))]
pub fn actualize_storage(
    actual_dir: &Path,
    storage_dir: &Path,
    prefix: &str,
    settings: &SyncSettings,
) -> Result<ActualizeSummary, SyncError> {
    let at = SyncError::at(Stage::Actualize);
    fs::create_dir_all(storage_dir)?;

    let start = Instant::now();
    let mut tree = settings.load_tree(storage_dir, prefix).map_err(at)?;
    info!("Loading hashtree: {:.2} sec", seconds(start));

    let before = tree.root_hash().map_err(at)?;
    let start = Instant::now();
    settings.actualizer().actualize(&mut tree, actual_dir).map_err(at)?;
    info!("Actualizing hashtree: {:.2} sec", seconds(start));

    let start = Instant::now();
    tree.save().map_err(at)?;
    info!("Saving hashtree: {:.2} sec", seconds(start));

    let root_hash = tree.get_hash(tree.root()).map_err(at)?;
    Ok(ActualizeSummary {
        root_changed: before.as_deref() != Some(root_hash.as_str()),
        root_hash,
        nodes: tree.nodes_count(),
        directories: tree.directories_count(),
    })
}

/// Difference that turns the old stored tree into the new one
#[instrument(skip(settings))]
pub fn compare_storages(
    old_storage_dir: &Path,
    old_prefix: &str,
    new_storage_dir: &Path,
    new_prefix: &str,
    settings: &SyncSettings,
) -> Result<TreeDifferenceCollector, SyncError> {
    let at = SyncError::at(Stage::Compare);
    for dir in [old_storage_dir, new_storage_dir] {
        if !dir.is_dir() {
            return Err(SyncError::MissingStorage(dir.to_path_buf()));
        }
    }

    let start = Instant::now();
    let old_tree = settings.load_tree(old_storage_dir, old_prefix).map_err(at)?;
    let new_tree = settings.load_tree(new_storage_dir, new_prefix).map_err(at)?;
    info!("Loading hashtrees: {:.2} sec", seconds(start));

    let start = Instant::now();
    let difference = TreeComparator::compare_trees(&new_tree, &old_tree).map_err(at)?;
    info!("Comparing hashtrees: {:.2} sec", seconds(start));
    info!("{}", difference.sizes());
    Ok(difference)
}

/// Apply `difference` to `target` with content from the archive at `archive_path`
///
/// A missing archive only fails the stage when the difference needs content.
#[instrument(skip(difference), fields(archive = %archive_path.display(), target = %target.display()))]
pub fn apply_archive_file(
    archive_path: &Path,
    target: &Path,
    difference: &TreeDifferenceCollector,
) -> Result<ApplyReport, SyncError> {
    let start = Instant::now();
    let report = if archive_path.exists() {
        let archive = apply::open_archive(archive_path)?;
        apply_difference(difference, archive.as_ref(), target)
    } else if difference.has_created_or_changed() {
        return Err(ArchiveError::MissingArchive(archive_path.to_path_buf()).into());
    } else {
        apply_difference(difference, &EmptyArchive, target)
    };
    info!("Applying difference: {:.2} sec", seconds(start));
    Ok(report)
}

/// Stored tree state and the changes made on disk since it was saved
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Root hash of the stored tree, `None` if it was never actualized
    pub stored_root_hash: Option<String>,
    pub stored_nodes: usize,
    pub stored_directories: usize,
    /// Difference from the stored tree to the directory as it is now
    pub pending: TreeDifferenceCollector,
}

/// Compare the stored tree with a fresh in-memory actualization of `actual_dir`.
/// Nothing is written.
#[instrument(skip(settings), fields(actual = %actual_dir.display(), storage = %storage_dir.display()))]
pub fn status(
    actual_dir: &Path,
    storage_dir: &Path,
    prefix: &str,
    settings: &SyncSettings,
) -> Result<StatusReport, SyncError> {
    let stored = if storage_dir.is_dir() {
        settings
            .load_tree(storage_dir, prefix)
            .map_err(SyncError::at(Stage::Compare))?
    } else {
        HashedFileTree::in_memory(settings.tree).map_err(SyncError::at(Stage::Compare))?
    };

    let mut live = HashedFileTree::in_memory(settings.tree).map_err(SyncError::at(Stage::Actualize))?;
    settings
        .actualizer()
        .actualize(&mut live, actual_dir)
        .map_err(SyncError::at(Stage::Actualize))?;

    let stored_root_hash = stored.root_hash().map_err(SyncError::at(Stage::Compare))?;
    let pending = if stored_root_hash.is_some() {
        TreeComparator::compare_trees(&live, &stored).map_err(SyncError::at(Stage::Compare))?
    } else {
        let mut everything = TreeDifferenceCollector::new();
        for path in live.list_subtree(live.root()).map_err(SyncError::at(Stage::Compare))? {
            everything.add_created(path);
        }
        everything
    };

    Ok(StatusReport {
        stored_root_hash,
        stored_nodes: stored.nodes_count(),
        stored_directories: stored.directories_count(),
        pending,
    })
}

/// Compare two stored trees and apply the result to `target`
pub fn compare_and_apply(
    old_storage_dir: &Path,
    old_prefix: &str,
    new_storage_dir: &Path,
    new_prefix: &str,
    archive_path: &Path,
    target: &Path,
    settings: &SyncSettings,
) -> Result<(TreeDifferenceCollector, ApplyReport), SyncError> {
    let difference =
        compare_storages(old_storage_dir, old_prefix, new_storage_dir, new_prefix, settings)?;
    let report = apply_archive_file(archive_path, target, &difference)?;
    Ok((difference, report))
}

/// Make `target` a copy of `source`, touching only what differs
///
/// Both directories are actualized into `storage_dir`, their trees compared,
/// the difference applied from `source`, and the target tree re-actualized.
#[instrument(skip(settings), fields(source = %source.display(), target = %target.display()))]
pub fn sync_directories(
    source: &Path,
    target: &Path,
    storage_dir: &Path,
    settings: &SyncSettings,
) -> Result<SyncSummary, SyncError> {
    fs::create_dir_all(target)?;
    actualize_storage(source, storage_dir, SOURCE_PREFIX, settings)?;
    actualize_storage(target, storage_dir, TARGET_PREFIX, settings)?;

    let difference =
        compare_storages(storage_dir, TARGET_PREFIX, storage_dir, SOURCE_PREFIX, settings)?;
    let report = apply_difference(&difference, &DirectoryArchive::new(source), target);
    let target_summary = actualize_storage(target, storage_dir, TARGET_PREFIX, settings)?;

    Ok(SyncSummary {
        difference,
        report,
        target: target_summary,
    })
}
