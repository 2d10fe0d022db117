//! Merge-style comparison of two hashed trees

use crate::diff::TreeDifferenceCollector;
use crate::error::TreeError;
use crate::tree::path::{self, ROOT};
use crate::tree::HashedFileTree;
use std::cmp::Ordering;
use tracing::trace;

/// Computes the difference that turns an old tree into a new one
pub struct TreeComparator;

impl TreeComparator {
    /// Compare both trees from the root
    pub fn compare_trees(
        new_tree: &HashedFileTree,
        old_tree: &HashedFileTree,
    ) -> Result<TreeDifferenceCollector, TreeError> {
        let mut collector = TreeDifferenceCollector::new();
        Self::compare(new_tree, old_tree, &mut collector, ROOT)?;
        Ok(collector)
    }

    /// Record the difference below `path`, which must exist in both trees
    ///
    /// Subtrees with equal hashes are skipped without descending. Directory
    /// children are matched by a two-pointer walk over the sorted names.
    pub fn compare(
        new_tree: &HashedFileTree,
        old_tree: &HashedFileTree,
        collector: &mut TreeDifferenceCollector,
        path: &str,
    ) -> Result<(), TreeError> {
        let mut stack = vec![path::normalize(path)];
        while let Some(current) = stack.pop() {
            if new_tree.get_hash(&current)? == old_tree.get_hash(&current)? {
                continue;
            }

            let new_is_directory = new_tree.has_directory(&current)?;
            let old_is_directory = old_tree.has_directory(&current)?;
            match (new_is_directory, old_is_directory) {
                (false, false) => collector.add_changed(current),
                (true, true) => {
                    Self::merge_children(new_tree, old_tree, collector, &current, &mut stack)?
                }
                _ => {
                    trace!(path = %current, "Node kind differs between trees");
                    Self::replace_subtree(new_tree, old_tree, collector, &current)?;
                }
            }
        }
        Ok(())
    }

    fn merge_children(
        new_tree: &HashedFileTree,
        old_tree: &HashedFileTree,
        collector: &mut TreeDifferenceCollector,
        dir: &str,
        pending: &mut Vec<String>,
    ) -> Result<(), TreeError> {
        let new_children = new_tree.sorted_children(dir)?;
        let old_children = old_tree.sorted_children(dir)?;
        let (mut i, mut j) = (0, 0);

        while i < new_children.len() || j < old_children.len() {
            let order = match (new_children.get(i), old_children.get(j)) {
                (Some(new_name), Some(old_name)) => new_name.cmp(old_name),
                (Some(_), None) => Ordering::Less,
                (None, _) => Ordering::Greater,
            };

            match order {
                Ordering::Less => {
                    let child = path::join(dir, &new_children[i]);
                    Self::add_created_subtree(new_tree, collector, &child)?;
                    i += 1;
                }
                Ordering::Greater => {
                    let child = path::join(dir, &old_children[j]);
                    Self::add_deleted_subtree(old_tree, collector, &child)?;
                    j += 1;
                }
                Ordering::Equal => {
                    pending.push(path::join(dir, &new_children[i]));
                    i += 1;
                    j += 1;
                }
            }
        }
        Ok(())
    }

    /// A file became a directory or the other way around: the old subtree is
    /// deleted as a whole and the new one created as a whole.
    fn replace_subtree(
        new_tree: &HashedFileTree,
        old_tree: &HashedFileTree,
        collector: &mut TreeDifferenceCollector,
        path: &str,
    ) -> Result<(), TreeError> {
        Self::add_created_subtree(new_tree, collector, path)?;
        Self::add_deleted_subtree(old_tree, collector, path)
    }

    /// Leaves of the subtree, plus `path` itself when it is a directory
    fn add_created_subtree(
        tree: &HashedFileTree,
        collector: &mut TreeDifferenceCollector,
        path: &str,
    ) -> Result<(), TreeError> {
        for created in tree.list_subtree(path)? {
            collector.add_created(created);
        }
        if tree.has_directory(path)? {
            collector.add_created(path);
        }
        Ok(())
    }

    fn add_deleted_subtree(
        tree: &HashedFileTree,
        collector: &mut TreeDifferenceCollector,
        path: &str,
    ) -> Result<(), TreeError> {
        for deleted in tree.list_subtree(path)? {
            collector.add_deleted(deleted);
        }
        if tree.has_directory(path)? {
            collector.add_deleted(path);
        }
        Ok(())
    }
}
