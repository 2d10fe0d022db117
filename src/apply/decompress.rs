//! Applies a tree difference to a target directory
//!
//! Best effort, not transactional: every path is handled on its own, and a
//! failure is logged and counted before moving on. Deletions run first
//! (deepest paths first), then creations (parents first), then changes.

use crate::apply::archive::Archive;
use crate::diff::TreeDifferenceCollector;
use crate::error::ArchiveError;
use crate::tree::path;
use crate::tree::walker::{self, NodeKind};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Per-path outcome counts of an apply run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    /// Already consistent on disk; nothing to do
    pub skipped: usize,
    pub failed: usize,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Make `target` match the new side of `difference`, taking content from `archive`
pub fn apply_difference(
    difference: &TreeDifferenceCollector,
    archive: &dyn Archive,
    target: &Path,
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for name in difference.deleted().iter().rev() {
        match delete(target, name) {
            Ok(true) => report.applied += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!(path = %name, error = %e, "Failed to delete");
                report.failed += 1;
            }
        }
    }

    for name in difference.created() {
        match create(archive, target, name) {
            Ok(true) => report.applied += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!(path = %name, error = %e, "Failed to create");
                report.failed += 1;
            }
        }
    }

    for name in difference.changed() {
        match change(archive, target, name) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                error!(path = %name, error = %e, "Failed to update");
                report.failed += 1;
            }
        }
    }

    info!(
        applied = report.applied,
        skipped = report.skipped,
        failed = report.failed,
        "Applied difference to {}",
        target.display()
    );
    report
}

fn checked(name: &str) -> Result<String, ArchiveError> {
    let name = path::normalize(name);
    if !path::is_contained(&name) || name == path::ROOT {
        return Err(ArchiveError::UnsafeEntry(name));
    }
    Ok(name)
}

fn kind_on_disk(location: &Path) -> Result<Option<NodeKind>, ArchiveError> {
    Ok(walker::node_kind(location)?)
}

/// Returns false when the path was already gone
fn delete(target: &Path, name: &str) -> Result<bool, ArchiveError> {
    let name = checked(name)?;
    let location = path::resolve(target, &name);
    match kind_on_disk(&location)? {
        None => {
            debug!(path = %name, "Deleted path is already absent");
            Ok(false)
        }
        Some(NodeKind::Directory) => {
            fs::remove_dir_all(&location)?;
            Ok(true)
        }
        Some(_) => {
            fs::remove_file(&location)?;
            Ok(true)
        }
    }
}

/// Returns false when something already exists at the path
fn create(archive: &dyn Archive, target: &Path, name: &str) -> Result<bool, ArchiveError> {
    let name = checked(name)?;
    let location = path::resolve(target, &name);
    if kind_on_disk(&location)?.is_some() {
        warn!(path = %name, "Created path already exists in {}, skipping", target.display());
        return Ok(false);
    }
    if !archive.has_entry(&name) {
        return Err(ArchiveError::MissingEntry(name));
    }

    if archive.is_directory(&name) {
        fs::create_dir_all(&location)?;
    } else {
        extract(archive, &name, &location)?;
    }
    Ok(true)
}

fn change(archive: &dyn Archive, target: &Path, name: &str) -> Result<(), ArchiveError> {
    let name = checked(name)?;
    let location = path::resolve(target, &name);
    match kind_on_disk(&location)? {
        None => warn!(path = %name, "Changed path is missing in {}, extracting anyway", target.display()),
        Some(NodeKind::Directory) => {
            if let Err(e) = fs::remove_dir_all(&location) {
                error!(path = %name, error = %e, "Failed to delete before update");
            }
        }
        Some(_) => {
            if let Err(e) = fs::remove_file(&location) {
                error!(path = %name, error = %e, "Failed to delete before update");
            }
        }
    }
    extract(archive, &name, &location)
}

fn extract(archive: &dyn Archive, name: &str, location: &Path) -> Result<(), ArchiveError> {
    let mut reader = archive.open_entry(name)?;
    if let Some(parent) = location.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(location)?);
    io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(())
}
