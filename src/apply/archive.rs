//! Archive boundary
//!
//! Apply only needs to know whether an entry exists, whether it is a
//! directory, and to stream a file entry's bytes. Entries are named by their
//! project-relative tree path.

use crate::diff::TreeDifferenceCollector;
use crate::error::ArchiveError;
use crate::tree::path;
use crate::tree::walker::{self, Entry, NodeKind, Walker};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Read access to the entries an apply run extracts from
pub trait Archive {
    fn has_entry(&self, path: &str) -> bool;
    fn is_directory(&self, path: &str) -> bool;
    fn open_entry(&self, path: &str) -> Result<Box<dyn Read>, ArchiveError>;
}

/// Archive without entries, used when a difference has only deletions
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyArchive;

impl Archive for EmptyArchive {
    fn has_entry(&self, _path: &str) -> bool {
        false
    }

    fn is_directory(&self, _path: &str) -> bool {
        false
    }

    fn open_entry(&self, path: &str) -> Result<Box<dyn Read>, ArchiveError> {
        Err(ArchiveError::MissingEntry(path.to_string()))
    }
}

/// Serves entries straight from a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn kind(&self, path: &str) -> Option<NodeKind> {
        let path = path::normalize(path);
        if !path::is_contained(&path) {
            return None;
        }
        walker::node_kind(&path::resolve(&self.root, &path)).ok().flatten()
    }
}

impl Archive for DirectoryArchive {
    fn has_entry(&self, path: &str) -> bool {
        matches!(self.kind(path), Some(NodeKind::File | NodeKind::Directory))
    }

    fn is_directory(&self, path: &str) -> bool {
        self.kind(path) == Some(NodeKind::Directory)
    }

    fn open_entry(&self, path: &str) -> Result<Box<dyn Read>, ArchiveError> {
        let path = path::normalize(path);
        if !path::is_contained(&path) {
            return Err(ArchiveError::UnsafeEntry(path));
        }
        if self.kind(&path) != Some(NodeKind::File) {
            return Err(ArchiveError::MissingEntry(path));
        }
        Ok(Box::new(File::open(path::resolve(&self.root, &path))?))
    }
}

#[derive(Debug, Clone, Copy)]
enum IndexedEntry {
    Directory,
    File { offset: u64, size: u64 },
}

/// Uncompressed tar archive with random access to its entries
///
/// The archive is scanned once on open; each file entry's data offset is
/// recorded so that `open_entry` seeks straight to it.
#[derive(Debug)]
pub struct TarArchive {
    path: PathBuf,
    entries: BTreeMap<String, IndexedEntry>,
    /// Directories that only exist as parents of other entries
    implied_directories: BTreeSet<String>,
}

impl TarArchive {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArchiveError::MissingArchive(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut archive = tar::Archive::new(io::BufReader::new(file));
        let mut entries = BTreeMap::new();
        let mut implied_directories = BTreeSet::new();

        for entry in archive.entries()? {
            let entry = entry?;
            let raw_name = entry.path()?;
            let Some(name) = raw_name.to_str().map(path::normalize) else {
                warn!(entry = %raw_name.display(), "Skipping archive entry with non UTF-8 name");
                continue;
            };
            if raw_name.is_absolute() || !path::is_contained(&name) {
                return Err(ArchiveError::UnsafeEntry(name));
            }
            if name == path::ROOT {
                continue;
            }

            let entry_type = entry.header().entry_type();
            let indexed = if entry_type.is_dir() {
                IndexedEntry::Directory
            } else if entry_type.is_file() {
                IndexedEntry::File {
                    offset: entry.raw_file_position(),
                    size: entry.size(),
                }
            } else {
                debug!(entry = %name, "Skipping unsupported archive entry type");
                continue;
            };

            for ancestor in path::ancestors(&name).into_iter().skip(1) {
                implied_directories.insert(ancestor);
            }
            entries.insert(name, indexed);
        }

        debug!(archive = %path.display(), entries = entries.len(), "Indexed archive");
        Ok(Self {
            path: path.to_path_buf(),
            entries,
            implied_directories,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of every explicit entry, in order
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Archive for TarArchive {
    fn has_entry(&self, path: &str) -> bool {
        let path = path::normalize(path);
        self.entries.contains_key(&path) || self.implied_directories.contains(&path)
    }

    fn is_directory(&self, path: &str) -> bool {
        let path = path::normalize(path);
        matches!(self.entries.get(&path), Some(IndexedEntry::Directory))
            || self.implied_directories.contains(&path)
    }

    fn open_entry(&self, path: &str) -> Result<Box<dyn Read>, ArchiveError> {
        let path = path::normalize(path);
        match self.entries.get(&path) {
            Some(IndexedEntry::File { offset, size }) => {
                let mut file = File::open(&self.path)?;
                file.seek(SeekFrom::Start(*offset))?;
                Ok(Box::new(file.take(*size)))
            }
            _ => Err(ArchiveError::MissingEntry(path)),
        }
    }
}

fn new_builder(archive: &Path) -> Result<tar::Builder<File>, ArchiveError> {
    if let Some(parent) = archive.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut builder = tar::Builder::new(File::create(archive)?);
    builder.mode(tar::HeaderMode::Deterministic);
    Ok(builder)
}

fn finish(builder: tar::Builder<File>) -> Result<(), ArchiveError> {
    let mut file = builder.into_inner()?;
    file.flush()?;
    Ok(())
}

/// Write every file and directory under `source` into a tar at `archive`.
/// Returns the number of entries written.
pub fn pack_directory(source: &Path, archive: &Path) -> Result<usize, ArchiveError> {
    let mut builder = new_builder(archive)?;
    let mut count = 0;
    for entry in Walker::new(source).walk()? {
        match &entry {
            Entry::Directory { path, absolute } => builder.append_dir(path, absolute)?,
            Entry::File { path, absolute, .. } => builder.append_path_with_name(absolute, path)?,
        }
        count += 1;
    }
    finish(builder)?;
    info!(source = %source.display(), archive = %archive.display(), entries = count, "Packed directory");
    Ok(count)
}

/// Write only the created and changed entries of `difference` from `source`
/// into a tar at `archive`. Returns the number of entries written.
pub fn pack_difference(
    source: &Path,
    difference: &TreeDifferenceCollector,
    archive: &Path,
) -> Result<usize, ArchiveError> {
    let mut builder = new_builder(archive)?;
    let mut count = 0;
    for name in difference.created().iter().chain(difference.changed()) {
        let absolute = path::resolve(source, name);
        match walker::node_kind(&absolute)? {
            Some(NodeKind::File) => builder.append_path_with_name(&absolute, name)?,
            Some(NodeKind::Directory) => builder.append_dir(name, &absolute)?,
            _ => {
                warn!(path = %name, "Skipping vanished entry while packing");
                continue;
            }
        }
        count += 1;
    }
    finish(builder)?;
    info!(archive = %archive.display(), entries = count, "Packed difference");
    Ok(count)
}

/// Open the archive at `path`: a directory is served as-is, anything else is read as tar
pub fn open_archive(path: &Path) -> Result<Box<dyn Archive>, ArchiveError> {
    if path.is_dir() {
        Ok(Box::new(DirectoryArchive::new(path)))
    } else {
        Ok(Box::new(TarArchive::open(path)?))
    }
}
