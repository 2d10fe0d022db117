//! Tree actualizer: brings a hashed tree in line with a directory on disk
//!
//! A full actualization walks the directory post-order. Every directory is
//! entered once (vanished tree children are dropped, kind changes replaced),
//! its children are visited in name order, and its hash is recomputed once
//! all of them are final. The walk keeps its own stack, so the depth of the
//! directory does not bound the native call stack.
//!
//! The single-path variants update the tree after one filesystem event and
//! rehash only the affected ancestor chain.

use crate::error::TreeError;
use crate::tree::hasher::NodeHasher;
use crate::tree::path::{self, ROOT};
use crate::tree::walker::{self, NodeKind};
use crate::tree::HashedFileTree;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

/// Directory being actualized: its path, the on-disk child names not visited
/// yet, and whether anything below it changed so far
struct DirFrame {
    path: String,
    pending: std::vec::IntoIter<String>,
    changed: bool,
}

/// Outcome of visiting one child of a directory
enum Visit {
    /// The child is final; carries whether its node changed
    Done(bool),
    /// The child is a directory that must be walked before its parent is sealed
    Descend(DirFrame),
}

/// Synchronizes hashed trees with the filesystem
pub struct TreeActualizer {
    hasher: NodeHasher,
}

impl Default for TreeActualizer {
    fn default() -> Self {
        Self::new(NodeHasher::default())
    }
}

impl TreeActualizer {
    pub fn new(hasher: NodeHasher) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &NodeHasher {
        &self.hasher
    }

    /// Make `tree` mirror the directory at `root`, reusing what already matches.
    /// A tree hashed with another digest is rebuilt from scratch.
    /// Returns whether any node changed.
    #[instrument(skip(self, tree), fields(root = %root.display()))]
    pub fn actualize(&self, tree: &mut HashedFileTree, root: &Path) -> Result<bool, TreeError> {
        if !root.is_dir() {
            return Err(TreeError::InvalidRoot(root.to_path_buf()));
        }

        let start = Instant::now();
        tree.use_algorithm(self.hasher.algorithm())?;
        let changed = self.actualize_directory(tree, root, ROOT)?;
        info!(
            changed,
            nodes = tree.nodes_count(),
            directories = tree.directories_count(),
            duration_ms = start.elapsed().as_millis(),
            "Tree actualized"
        );
        Ok(changed)
    }

    /// Actualize the subtree of `dir`, which must already be a directory node.
    /// Only directories with a changed descendant are rehashed.
    fn actualize_directory(
        &self,
        tree: &mut HashedFileTree,
        root: &Path,
        dir: &str,
    ) -> Result<bool, TreeError> {
        let mut stack = vec![self.enter(tree, root, dir)?];
        let mut changed = false;
        while let Some(frame) = stack.last_mut() {
            match frame.pending.next() {
                Some(name) => {
                    let parent = frame.path.clone();
                    match self.visit(tree, root, &parent, &name)? {
                        Visit::Done(child_changed) => frame.changed |= child_changed,
                        Visit::Descend(child) => stack.push(child),
                    }
                }
                None => {
                    if let Some(done) = stack.pop() {
                        if done.changed {
                            self.rehash_directory(tree, &done.path)?;
                        }
                        match stack.last_mut() {
                            Some(parent) => parent.changed |= done.changed,
                            None => changed = done.changed,
                        }
                    }
                }
            }
        }
        Ok(changed)
    }

    /// Drop tree children that vanished from disk and queue the ones that exist
    fn enter(&self, tree: &mut HashedFileTree, root: &Path, dir: &str) -> Result<DirFrame, TreeError> {
        let on_disk = walker::read_child_names(&path::resolve(root, dir))?;
        let mut changed = !tree.is_hashed(dir)?;
        for name in tree.sorted_children(dir)? {
            if on_disk.binary_search(&name).is_err() {
                let child = path::join(dir, &name);
                trace!(path = %child, "Removing vanished node");
                tree.remove_subtree(&child)?;
                changed = true;
            }
        }

        Ok(DirFrame {
            path: dir.to_string(),
            pending: on_disk.into_iter(),
            changed,
        })
    }

    fn visit(
        &self,
        tree: &mut HashedFileTree,
        root: &Path,
        parent: &str,
        name: &str,
    ) -> Result<Visit, TreeError> {
        let child = path::join(parent, name);
        let location = path::resolve(root, &child);
        let kind = walker::node_kind(&location).map_err(|e| TreeError::io(&location, e))?;

        match kind {
            Some(NodeKind::File) => Ok(Visit::Done(
                self.actualize_file(tree, &location, parent, &child)?,
            )),
            Some(NodeKind::Directory) => {
                if tree.has_file(&child)? {
                    tree.remove_subtree(&child)?;
                }
                if !tree.has_directory(&child)? {
                    tree.add_directory_without_hash(&child, parent)?;
                }
                Ok(Visit::Descend(self.enter(tree, root, &child)?))
            }
            Some(NodeKind::Unsupported) | None => {
                // Vanished between listing and visiting, or not representable
                if tree.has_file(&child)? || tree.has_directory(&child)? {
                    tree.remove_subtree(&child)?;
                    return Ok(Visit::Done(true));
                }
                Ok(Visit::Done(false))
            }
        }
    }

    /// Hash the file at `location` into the node `child`. Returns whether the node changed.
    fn actualize_file(
        &self,
        tree: &mut HashedFileTree,
        location: &Path,
        parent: &str,
        child: &str,
    ) -> Result<bool, TreeError> {
        if tree.has_directory(child)? {
            tree.remove_subtree(child)?;
        }

        let hash = self
            .hasher
            .hash_file(path::name(child), location)
            .map_err(|e| TreeError::io(location, e))?;

        if tree.has_file(child)? {
            if tree.get_hash(child)? == hash {
                return Ok(false);
            }
            tree.update_hash(child, &hash)?;
        } else {
            tree.add_file(child, parent, &hash)?;
        }
        Ok(true)
    }

    /// Recompute the hash of `dir` from the current hashes of its children
    pub fn rehash_directory(&self, tree: &mut HashedFileTree, dir: &str) -> Result<(), TreeError> {
        let dir = path::normalize(dir);
        let mut child_hashes = Vec::new();
        for name in tree.sorted_children(&dir)? {
            child_hashes.push(tree.get_hash(&path::join(&dir, &name))?);
        }
        let hash = self
            .hasher
            .hash_directory(path::name(&dir), child_hashes.iter().map(String::as_str));
        tree.update_hash(&dir, &hash)
    }

    fn rehash_ancestors(&self, tree: &mut HashedFileTree, changed: &str) -> Result<(), TreeError> {
        for ancestor in path::ancestors(changed).iter().rev() {
            self.rehash_directory(tree, ancestor)?;
        }
        Ok(())
    }

    /// Update the tree after `path` was created or modified on disk
    ///
    /// Missing ancestor directories are added, the node itself is actualized
    /// (a directory with its whole subtree) and the ancestor chain is rehashed.
    /// Falls back to [`Self::actualize_when_single_file_deleted`] when the
    /// path no longer exists. Returns whether the tree changed.
    pub fn actualize_when_single_file_generated(
        &self,
        tree: &mut HashedFileTree,
        root: &Path,
        path: &str,
    ) -> Result<bool, TreeError> {
        let path = path::normalize(path);
        if path == ROOT || tree.use_algorithm(self.hasher.algorithm())? {
            return self.actualize(tree, root);
        }

        let location = path::resolve(root, &path);
        let kind = walker::node_kind(&location).map_err(|e| TreeError::io(&location, e))?;
        let kind = match kind {
            None | Some(NodeKind::Unsupported) => {
                return self.actualize_when_single_file_deleted(tree, root, &path)
            }
            Some(kind) => kind,
        };

        let mut changed = false;
        for ancestor in path::ancestors(&path).iter().skip(1) {
            if tree.has_file(ancestor)? {
                tree.remove_subtree(ancestor)?;
            }
            if !tree.has_directory(ancestor)? {
                tree.add_directory_without_hash(ancestor, &path::parent(ancestor))?;
                changed = true;
            }
        }

        let parent = path::parent(&path);
        match kind {
            NodeKind::File => {
                changed |= self.actualize_file(tree, &location, &parent, &path)?;
            }
            _ => {
                if tree.has_file(&path)? {
                    tree.remove_subtree(&path)?;
                }
                if !tree.has_directory(&path)? {
                    tree.add_directory_without_hash(&path, &parent)?;
                }
                changed |= self.actualize_directory(tree, root, &path)?;
            }
        }

        if changed {
            self.rehash_ancestors(tree, &path)?;
        }
        debug!(path = %path, changed, "Actualized generated path");
        Ok(changed)
    }

    /// Update the tree after `path` was deleted on disk
    ///
    /// The topmost tree node that no longer exists on disk is removed together
    /// with its subtree and the remaining ancestors are rehashed. If the path
    /// exists again, this is handled as a generation. Returns whether the tree changed.
    pub fn actualize_when_single_file_deleted(
        &self,
        tree: &mut HashedFileTree,
        root: &Path,
        path: &str,
    ) -> Result<bool, TreeError> {
        let path = path::normalize(path);
        if tree.use_algorithm(self.hasher.algorithm())? && root.is_dir() {
            return self.actualize(tree, root);
        }
        if path == ROOT {
            if root.is_dir() {
                return self.actualize(tree, root);
            }
            tree.remove_subtree(ROOT)?;
            return Ok(true);
        }

        let exists = |tree_path: &str| -> Result<Option<NodeKind>, TreeError> {
            let location = path::resolve(root, tree_path);
            walker::node_kind(&location).map_err(|e| TreeError::io(&location, e))
        };

        let mut vanished = path.clone();
        for ancestor in path::ancestors(&path).iter().skip(1) {
            match exists(ancestor)? {
                Some(NodeKind::Directory) => continue,
                Some(NodeKind::File) => {
                    // A directory replaced by a file: the file itself is new
                    return self.actualize_when_single_file_generated(tree, root, ancestor);
                }
                Some(NodeKind::Unsupported) | None => {
                    vanished = ancestor.clone();
                    break;
                }
            }
        }

        if vanished == path {
            if let Some(NodeKind::File | NodeKind::Directory) = exists(&path)? {
                return self.actualize_when_single_file_generated(tree, root, &path);
            }
        }

        if !tree.has_file(&vanished)? && !tree.has_directory(&vanished)? {
            debug!(path = %path, "Deleted path was not tracked");
            return Ok(false);
        }

        tree.remove_subtree(&vanished)?;
        self.rehash_ancestors(tree, &vanished)?;
        debug!(path = %path, removed = %vanished, "Actualized deleted path");
        Ok(true)
    }
}
