//! Integration tests for tree comparison on concrete directory changes

use crate::integration::test_utils::{actualized, write_files};
use hashsync::diff::TreeComparator;
use hashsync::tree::TreeActualizer;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_modify_delete_create_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, &[("a/x", "1"), ("a/y", "2"), ("b", "3")]);

    let old = actualized(root);
    let mut current = actualized(root);

    fs::write(root.join("a/x"), "9").unwrap();
    fs::remove_file(root.join("b")).unwrap();
    fs::write(root.join("c"), "4").unwrap();

    let changed = TreeActualizer::default()
        .actualize(&mut current, root)
        .unwrap();
    assert!(changed);

    let difference = TreeComparator::compare_trees(&current, &old).unwrap();
    assert_eq!(difference.changed(), &set(&["a/x"]));
    assert_eq!(difference.deleted(), &set(&["b"]));
    assert_eq!(difference.created(), &set(&["c"]));
}

#[test]
fn test_empty_directory_trees() {
    let temp_dir = TempDir::new().unwrap();
    let empty = actualized(temp_dir.path());
    assert!(empty.root_hash().unwrap().is_some());
    assert!(TreeComparator::compare_trees(&empty, &empty)
        .unwrap()
        .is_empty());

    write_files(temp_dir.path(), &[("only", "x")]);
    let filled = actualized(temp_dir.path());
    let difference = TreeComparator::compare_trees(&filled, &empty).unwrap();
    assert_eq!(difference.created(), &set(&["only"]));
    assert!(difference.deleted().is_empty());
}

#[test]
fn test_file_replaced_by_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, &[("p", "file")]);
    let old = actualized(root);

    fs::remove_file(root.join("p")).unwrap();
    write_files(root, &[("p/q", "nested")]);
    let new = actualized(root);

    let difference = TreeComparator::compare_trees(&new, &old).unwrap();
    assert_eq!(difference.deleted(), &set(&["p"]));
    assert_eq!(difference.created(), &set(&["p", "p/q"]));
    assert!(difference.changed().is_empty());
}

#[test]
fn test_directory_replaced_by_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, &[("d/x", "1"), ("d/sub/y", "2")]);
    let old = actualized(root);

    fs::remove_dir_all(root.join("d")).unwrap();
    write_files(root, &[("d", "now a file")]);
    let new = actualized(root);

    let difference = TreeComparator::compare_trees(&new, &old).unwrap();
    assert_eq!(difference.deleted(), &set(&["d", "d/sub/y", "d/x"]));
    assert_eq!(difference.created(), &set(&["d"]));
}

/// Paths on one side only appear with their whole subtree in exactly one set;
/// a one-sided directory is listed itself so that apply can remove it
#[test]
fn test_subtree_completeness() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, &[("keep", "k"), ("gone/a", "1"), ("gone/b/c", "2")]);
    let old = actualized(root);

    fs::remove_dir_all(root.join("gone")).unwrap();
    write_files(root, &[("new/a", "1"), ("new/empty/", "")]);
    let new = actualized(root);

    let difference = TreeComparator::compare_trees(&new, &old).unwrap();
    assert_eq!(difference.deleted(), &set(&["gone", "gone/a", "gone/b/c"]));
    assert_eq!(difference.created(), &set(&["new", "new/a", "new/empty"]));
    assert!(difference.changed().is_empty());
    assert!(difference.created().is_disjoint(difference.deleted()));
}

#[test]
fn test_identical_trees_have_no_difference() {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), &[("a/b/c", "1"), ("d", "2")]);
    let tree = actualized(temp_dir.path());
    let difference = TreeComparator::compare_trees(&tree, &actualized(temp_dir.path())).unwrap();
    assert!(difference.is_empty());
    assert_eq!(difference.sizes(), "Created: 0, deleted: 0, changed: 0");
}
