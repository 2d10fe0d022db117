//! Error types for the hashtree synchronization engine.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors (persisted path maps)
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file or database does not exist yet. Recoverable: callers
    /// proceed with a fresh tree and create the storage on save.
    #[error("Storage not found: {0}")]
    NotFound(PathBuf),

    #[error("Serialization failed for {path}: {message}")]
    Serialization { path: PathBuf, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Hashed file tree errors
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node not found in tree: {0}")]
    NodeNotFound(String),

    #[error("Path is already present in the tree: {0}")]
    AlreadyExists(String),

    #[error("Not a directory in the tree: {0}")]
    NotADirectory(String),

    #[error("Hash of directory {0} has not been computed yet")]
    UninitializedHash(String),

    #[error("Actualization root must be a directory: {0:?}")]
    InvalidRoot(PathBuf),

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TreeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TreeError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Archive boundary errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Missing archive file: {0:?}")]
    MissingArchive(PathBuf),

    #[error("Archive has no entry for {0}")]
    MissingEntry(String),

    #[error("Archive entry escapes the target directory: {0}")]
    UnsafeEntry(String),

    #[error("Failed to read source directory: {0}")]
    Source(#[from] TreeError),

    #[error("Archive I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Pipeline stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Actualize,
    Compare,
    Apply,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Actualize => write!(f, "actualize"),
            Stage::Compare => write!(f, "compare"),
            Stage::Apply => write!(f, "apply"),
        }
    }
}

/// Top-level errors reported at the stage boundary
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{stage} failed: {source}")]
    Tree {
        stage: Stage,
        #[source]
        source: TreeError,
    },

    #[error("apply failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Missing storage directory: {0:?}")]
    MissingStorage(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SyncError {
    pub fn at(stage: Stage) -> impl Fn(TreeError) -> SyncError + Copy {
        move |source| SyncError::Tree { stage, source }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}

impl From<notify::Error> for SyncError {
    fn from(err: notify::Error) -> Self {
        SyncError::Watch(err.to_string())
    }
}
