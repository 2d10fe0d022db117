//! Path Map Store
//!
//! Storage-agnostic key → value maps backing a hashed tree: one map from path
//! to hash, one from directory path to its sorted child names. Backends are
//! interchangeable behind [`MapStorage`].

pub mod file;
pub mod memory;
pub mod persistence;

pub use file::FileMap;
pub use memory::InMemoryMap;
pub use persistence::SledMap;

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Extension of the path → hash companion file
pub const HASHES_FILE_EXTENSION: &str = ".hashes";
/// Extension of the path → children companion file
pub const TREE_FILE_EXTENSION: &str = ".tree";

pub fn hashes_file_name(prefix: &str) -> String {
    format!("{}{}", prefix, HASHES_FILE_EXTENSION)
}

pub fn tree_file_name(prefix: &str) -> String {
    format!("{}{}", prefix, TREE_FILE_EXTENSION)
}

/// Sorted set of child names of one directory
pub type ChildNames = BTreeSet<String>;

/// Persistent path-keyed map
///
/// Keys are normalized tree paths. `load` replaces the in-memory view with
/// the persisted one and reports [`StorageError::NotFound`] when nothing has
/// been persisted yet; `save` makes every change so far durable.
pub trait MapStorage<V> {
    fn get(&self, key: &str) -> Result<Option<V>, StorageError>;
    fn put(&mut self, key: &str, value: V) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn contains_key(&self, key: &str) -> Result<bool, StorageError>;

    /// Update the value under `key` in place. Returns false if the key is absent.
    fn modify(&mut self, key: &str, f: &mut dyn FnMut(&mut V)) -> Result<bool, StorageError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    fn clear(&mut self) -> Result<(), StorageError>;

    fn load(&mut self) -> Result<(), StorageError>;
    fn save(&mut self) -> Result<(), StorageError>;
}

/// Path → hash mapping
pub type PathMap = Box<dyn MapStorage<String>>;
/// Directory path → sorted child names mapping
pub type ChildrenMap = Box<dyn MapStorage<ChildNames>>;

/// Which persistent backend stores the two companion maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Whole-map bincode snapshot per companion file
    #[default]
    File,
    /// One sled database per companion file
    Sled,
    /// Nothing is persisted
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "sled" => Ok(StorageBackend::Sled),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "Unknown storage backend: {} (must be 'file', 'sled' or 'memory')",
                other
            )),
        }
    }
}

impl StorageBackend {
    /// Open both companion maps for `prefix` under `storage_dir`
    pub fn open(self, storage_dir: &Path, prefix: &str) -> Result<(PathMap, ChildrenMap), StorageError> {
        let hashes_path = storage_dir.join(hashes_file_name(prefix));
        let tree_path = storage_dir.join(tree_file_name(prefix));
        let maps: (PathMap, ChildrenMap) = match self {
            StorageBackend::File => (
                Box::new(FileMap::<String>::new(hashes_path)),
                Box::new(FileMap::<ChildNames>::new(tree_path)),
            ),
            StorageBackend::Sled => (
                Box::new(SledMap::<String>::open(hashes_path)?),
                Box::new(SledMap::<ChildNames>::open(tree_path)?),
            ),
            StorageBackend::Memory => (
                Box::new(InMemoryMap::<String>::new()),
                Box::new(InMemoryMap::<ChildNames>::new()),
            ),
        };
        Ok(maps)
    }
}
