//! Filesystem walker for traversing directory structures

use crate::error::TreeError;
use crate::tree::path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// What a filesystem entry counts as in a hashed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    /// Sockets, devices, and symlinks to directories or to nothing; never part of a tree
    Unsupported,
}

/// Kind of the entry at `path`, or `None` when nothing is there
///
/// A path below a regular file (ENOTDIR) is absent too. Symbolic links to
/// regular files count as files. Directory symlinks are not followed.
pub fn node_kind(path: &Path) -> io::Result<Option<NodeKind>> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if is_absent(&e) => return Ok(None),
        Err(e) => return Err(e),
    };

    let kind = if metadata.is_dir() {
        NodeKind::Directory
    } else if metadata.is_file() {
        NodeKind::File
    } else if metadata.file_type().is_symlink() {
        match fs::metadata(path) {
            Ok(target) if target.is_file() => NodeKind::File,
            Ok(_) => NodeKind::Unsupported,
            Err(e) if is_absent(&e) => NodeKind::Unsupported,
            Err(e) => return Err(e),
        }
    } else {
        NodeKind::Unsupported
    };
    Ok(Some(kind))
}

fn is_absent(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Sorted names of the entries directly inside `dir`
///
/// Names that are not valid UTF-8 cannot be tree paths and are skipped.
pub fn read_child_names(dir: &Path) -> Result<Vec<String>, TreeError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| TreeError::io(dir, e))? {
        let entry = entry.map_err(|e| TreeError::io(dir, e))?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!(dir = %dir.display(), name = ?raw, "Skipping entry with non UTF-8 name"),
        }
    }
    names.sort();
    Ok(names)
}

/// Filesystem entry types
#[derive(Debug, Clone)]
pub enum Entry {
    /// A file entry with its tree path, location on disk and size
    File {
        path: String,
        absolute: PathBuf,
        size: u64,
    },
    /// A directory entry with its tree path and location on disk
    Directory { path: String, absolute: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &str {
        match self {
            Entry::File { path, .. } | Entry::Directory { path, .. } => path,
        }
    }

    pub fn absolute(&self) -> &Path {
        match self {
            Entry::File { absolute, .. } | Entry::Directory { absolute, .. } => absolute,
        }
    }
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    max_depth: Option<usize>,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: None,
        }
    }

    /// Limit how deep below the root the walk descends
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Walk the filesystem and collect every file and directory below the root
    ///
    /// Returns entries sorted by tree path, parents before their children.
    /// Entries a hashed tree would not contain are left out.
    pub fn walk(&self) -> Result<Vec<Entry>, TreeError> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                let location = e.path().unwrap_or(&self.root).to_path_buf();
                TreeError::io(location, io::Error::other(format!("Failed to walk directory: {}", e)))
            })?;

            let absolute = entry.path().to_path_buf();
            let Some(path) = path::relative_to(&self.root, &absolute) else {
                warn!(path = %absolute.display(), "Skipping entry with non UTF-8 path");
                continue;
            };

            match node_kind(&absolute).map_err(|e| TreeError::io(&absolute, e))? {
                Some(NodeKind::File) => {
                    let size = fs::metadata(&absolute)
                        .map_err(|e| TreeError::io(&absolute, e))?
                        .len();
                    entries.push(Entry::File {
                        path,
                        absolute,
                        size,
                    });
                }
                Some(NodeKind::Directory) => entries.push(Entry::Directory { path, absolute }),
                Some(NodeKind::Unsupported) | None => {}
            }
        }

        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    /// Tree paths of all files below the root
    pub fn files(&self) -> Result<Vec<String>, TreeError> {
        Ok(self
            .walk()?
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::File { path, .. } => Some(path),
                Entry::Directory { .. } => None,
            })
            .collect())
    }
}
