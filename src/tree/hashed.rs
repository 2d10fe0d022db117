//! The hashed file tree data structure
//!
//! Two maps make up a tree: path → hash for every node, and directory path →
//! sorted child names for every directory. A path is a directory exactly when
//! it has an entry in the children map; parents are found by stripping the
//! last path segment.

use crate::error::{StorageError, TreeError};
use crate::store::{ChildNames, ChildrenMap, InMemoryMap, PathMap, StorageBackend};
use crate::tree::hasher::HashAlgorithm;
use crate::tree::path::{self, ROOT};
use crate::tree::TreeSettings;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Placeholder hash of a directory whose hash has not been computed yet
pub const INITIAL_DIRECTORY_HASH: &str = "initial_directory_hash";

/// Key in the path map that records the digest the hashes were built with.
/// Tree paths are relative, so it never collides with a node.
const ALGORITHM_KEY: &str = "/algorithm";

/// Outcome of [`HashedFileTree::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    /// Nothing persisted yet; the tree holds only the uninitialized root
    NotFound,
}

/// Directory tree with per-node hashes
pub struct HashedFileTree {
    hashes: PathMap,
    tree: ChildrenMap,
    nodes_count: usize,
    directories_count: usize,
    strict: bool,
}

impl std::fmt::Debug for HashedFileTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashedFileTree")
            .field("nodes_count", &self.nodes_count)
            .field("directories_count", &self.directories_count)
            .field("strict", &self.strict)
            .finish()
    }
}

impl HashedFileTree {
    /// Create a tree over the given maps. Entries already present in the maps
    /// are kept; the root is inserted with the sentinel hash if missing.
    pub fn new(hashes: PathMap, tree: ChildrenMap, settings: TreeSettings) -> Result<Self, TreeError> {
        let mut result = Self {
            hashes,
            tree,
            nodes_count: 0,
            directories_count: 0,
            strict: settings.strict,
        };
        result.ensure_root()?;
        result.recount()?;
        Ok(result)
    }

    /// Tree that lives only in memory
    pub fn in_memory(settings: TreeSettings) -> Result<Self, TreeError> {
        Self::new(
            Box::new(InMemoryMap::<String>::new()),
            Box::new(InMemoryMap::<ChildNames>::new()),
            settings,
        )
    }

    /// Tree persisted as `<prefix>.hashes` and `<prefix>.tree` under `storage_dir`
    pub fn open(
        storage_dir: &Path,
        prefix: &str,
        backend: StorageBackend,
        settings: TreeSettings,
    ) -> Result<Self, TreeError> {
        let (hashes, tree) = backend.open(storage_dir, prefix)?;
        Self::new(hashes, tree, settings)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn ensure_root(&mut self) -> Result<(), TreeError> {
        if !self.hashes.contains_key(ROOT)? {
            self.hashes.put(ROOT, INITIAL_DIRECTORY_HASH.to_string())?;
        }
        if !self.tree.contains_key(ROOT)? {
            self.tree.put(ROOT, ChildNames::new())?;
        }
        Ok(())
    }

    fn recount(&mut self) -> Result<(), TreeError> {
        let marker = usize::from(self.hashes.contains_key(ALGORITHM_KEY)?);
        self.nodes_count = self.hashes.len() - marker;
        self.directories_count = self.tree.len();
        Ok(())
    }

    /// Digest the stored hashes were computed with, if recorded
    pub fn algorithm(&self) -> Result<Option<HashAlgorithm>, TreeError> {
        Ok(self
            .hashes
            .get(ALGORITHM_KEY)?
            .and_then(|name| name.parse().ok()))
    }

    /// Record `algorithm` as the digest of this tree. A tree built with a
    /// different digest is reset first, since none of its hashes can be reused.
    /// Returns whether the tree was reset.
    pub fn use_algorithm(&mut self, algorithm: HashAlgorithm) -> Result<bool, TreeError> {
        let recorded = self.hashes.get(ALGORITHM_KEY)?;
        if recorded.as_deref() == Some(algorithm.as_str()) {
            return Ok(false);
        }

        let reset = recorded.is_some() || self.nodes_count > 1 || self.is_hashed(ROOT)?;
        if reset {
            debug!(
                recorded = recorded.as_deref().unwrap_or("unknown"),
                algorithm = %algorithm,
                "Hash algorithm changed, dropping stored hashes"
            );
            self.reset()?;
        }
        self.hashes.put(ALGORITHM_KEY, algorithm.as_str().to_string())?;
        Ok(reset)
    }

    /// Drop every node and start over with an uninitialized root
    fn reset(&mut self) -> Result<(), TreeError> {
        self.hashes.clear()?;
        self.tree.clear()?;
        self.ensure_root()?;
        self.recount()?;
        Ok(())
    }

    /// Restore the persisted tree. Missing storage is not an error: the tree
    /// is reset to an uninitialized root and [`LoadStatus::NotFound`] returned.
    pub fn load(&mut self) -> Result<LoadStatus, TreeError> {
        let loaded = self.hashes.load().and_then(|_| self.tree.load());
        match loaded {
            Ok(()) => {
                self.ensure_root()?;
                self.recount()?;
                Ok(LoadStatus::Loaded)
            }
            Err(StorageError::NotFound(missing)) => {
                debug!(storage = %missing.display(), "Hashtree storage is missing and will be created at saving");
                self.reset()?;
                Ok(LoadStatus::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&mut self) -> Result<(), TreeError> {
        self.hashes.save()?;
        self.tree.save()?;
        Ok(())
    }

    fn has_node(&self, path: &str) -> Result<bool, TreeError> {
        Ok(self.hashes.contains_key(path)?)
    }

    /// Whether the given node is a (possibly empty) directory
    pub fn has_directory(&self, path: &str) -> Result<bool, TreeError> {
        let path = path::normalize(path);
        Ok(self.tree.contains_key(&path)?)
    }

    /// Whether the given node is a file
    pub fn has_file(&self, path: &str) -> Result<bool, TreeError> {
        let path = path::normalize(path);
        Ok(self.has_node(&path)? && !self.tree.contains_key(&path)?)
    }

    /// Path of the tree root
    pub fn root(&self) -> &'static str {
        ROOT
    }

    /// Path of the directory containing `path`
    pub fn parent_of(&self, path: &str) -> String {
        path::parent(&path::normalize(path))
    }

    /// Path of the child called `name` under `parent`
    pub fn path_by_name(&self, parent: &str, name: &str) -> String {
        path::join(&path::normalize(parent), name)
    }

    fn add_node(&mut self, path: &str, parent: &str, hash: String) -> Result<(), TreeError> {
        if self.strict {
            if self.has_node(path)? {
                return Err(TreeError::AlreadyExists(path.to_string()));
            }
            if !self.tree.contains_key(parent)? {
                return Err(TreeError::NotADirectory(parent.to_string()));
            }
        }

        let name = path::name(path).to_string();
        self.tree.modify(parent, &mut |children| {
            children.insert(name.clone());
        })?;
        self.hashes.put(path, hash)?;
        self.nodes_count += 1;
        Ok(())
    }

    fn remove_node(&mut self, path: &str) -> Result<(), TreeError> {
        let existed = self.has_node(path)?;
        if self.strict && !existed {
            return Err(TreeError::NodeNotFound(path.to_string()));
        }

        let parent = path::parent(path);
        let name = path::name(path);
        self.tree.modify(&parent, &mut |children| {
            children.remove(name);
        })?;
        self.hashes.remove(path)?;
        if existed {
            self.nodes_count = self.nodes_count.saturating_sub(1);
        }
        Ok(())
    }

    pub fn add_directory(&mut self, path: &str, parent: &str, hash: &str) -> Result<(), TreeError> {
        let path = path::normalize(path);
        let parent = path::normalize(parent);
        self.add_node(&path, &parent, hash.to_string())?;
        self.tree.put(&path, ChildNames::new())?;
        self.directories_count += 1;
        Ok(())
    }

    /// Add a directory whose hash will be computed later
    pub fn add_directory_without_hash(&mut self, path: &str, parent: &str) -> Result<(), TreeError> {
        self.add_directory(path, parent, INITIAL_DIRECTORY_HASH)
    }

    pub fn add_file(&mut self, path: &str, parent: &str, hash: &str) -> Result<(), TreeError> {
        let path = path::normalize(path);
        let parent = path::normalize(parent);
        self.add_node(&path, &parent, hash.to_string())
    }

    /// Remove the node and, for a directory, its whole subtree (children first).
    /// Removing the root leaves an empty, uninitialized root behind.
    pub fn remove_subtree(&mut self, path: &str) -> Result<(), TreeError> {
        let path = path::normalize(path);
        if path == ROOT {
            return self.reset();
        }

        let mut stack = vec![(path, false)];
        while let Some((current, expanded)) = stack.pop() {
            let is_directory = self.tree.contains_key(&current)?;
            if is_directory && !expanded {
                let children = self.sorted_children(&current)?;
                stack.push((current.clone(), true));
                for name in children {
                    stack.push((path::join(&current, &name), false));
                }
                continue;
            }

            if is_directory {
                self.tree.remove(&current)?;
                self.directories_count = self.directories_count.saturating_sub(1);
            }
            self.remove_node(&current)?;
        }
        Ok(())
    }

    /// Sorted snapshot of the child names of a directory
    ///
    /// The result is an independent copy; the tree may be mutated while it is iterated.
    pub fn sorted_children(&self, dir: &str) -> Result<Vec<String>, TreeError> {
        let dir = path::normalize(dir);
        match self.tree.get(&dir)? {
            Some(children) => Ok(children.into_iter().collect()),
            None => Err(TreeError::NotADirectory(dir)),
        }
    }

    /// Paths of all leaves in the subtree of `path`, in lexicographic order.
    /// Leaves are files and empty directories; for a file node the result is
    /// the file itself.
    pub fn list_subtree(&self, path: &str) -> Result<Vec<String>, TreeError> {
        let path = path::normalize(path);
        let mut result = Vec::new();
        let mut stack = vec![path];
        while let Some(current) = stack.pop() {
            if let Some(children) = self.tree.get(&current)? {
                if children.is_empty() && current != ROOT {
                    result.push(current);
                    continue;
                }
                for name in children.into_iter().rev() {
                    stack.push(path::join(&current, &name));
                }
            } else if self.has_node(&current)? {
                result.push(current);
            } else {
                return Err(TreeError::NodeNotFound(current));
            }
        }
        Ok(result)
    }

    pub fn get_hash(&self, path: &str) -> Result<String, TreeError> {
        let path = path::normalize(path);
        let hash = self
            .hashes
            .get(&path)?
            .ok_or_else(|| TreeError::NodeNotFound(path.clone()))?;
        if self.strict && hash == INITIAL_DIRECTORY_HASH {
            return Err(TreeError::UninitializedHash(path));
        }
        Ok(hash)
    }

    pub fn update_hash(&mut self, path: &str, hash: &str) -> Result<(), TreeError> {
        let path = path::normalize(path);
        if self.strict && !self.has_node(&path)? {
            return Err(TreeError::NodeNotFound(path));
        }
        self.hashes.put(&path, hash.to_string())?;
        Ok(())
    }

    /// Root hash, or `None` before the first actualization
    pub fn root_hash(&self) -> Result<Option<String>, TreeError> {
        Ok(self
            .hashes
            .get(ROOT)?
            .filter(|hash| hash != INITIAL_DIRECTORY_HASH))
    }

    /// Whether `path` exists and carries a computed hash
    pub fn is_hashed(&self, path: &str) -> Result<bool, TreeError> {
        let path = path::normalize(path);
        Ok(self
            .hashes
            .get(&path)?
            .is_some_and(|hash| hash != INITIAL_DIRECTORY_HASH))
    }

    /// Every node reachable from the root with its hash
    pub fn node_hashes(&self) -> Result<BTreeMap<String, String>, TreeError> {
        let mut result = BTreeMap::new();
        let mut stack = vec![ROOT.to_string()];
        while let Some(current) = stack.pop() {
            let hash = self
                .hashes
                .get(&current)?
                .ok_or_else(|| TreeError::NodeNotFound(current.clone()))?;
            if self.tree.contains_key(&current)? {
                for name in self.sorted_children(&current)? {
                    stack.push(path::join(&current, &name));
                }
            }
            result.insert(current, hash);
        }
        Ok(result)
    }

    /// The total number of nodes in the tree, root included
    pub fn nodes_count(&self) -> usize {
        self.nodes_count
    }

    /// The total number of directories in the tree, root included
    pub fn directories_count(&self) -> usize {
        self.directories_count
    }
}
