//! Integration tests: single-path updates agree with a full re-walk

use crate::integration::test_utils::{actualized, write_files};
use hashsync::tree::{HashedFileTree, TreeActualizer};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BASE: &[(&str, &str)] = &[
    ("src/main.rs", "fn main() {}"),
    ("src/lib/mod.rs", "pub mod a;"),
    ("src/lib/a.rs", "pub fn a() {}"),
    ("README", "readme"),
    ("empty/", ""),
];

fn assert_matches_full(tree: &HashedFileTree, root: &Path) {
    assert_eq!(
        tree.node_hashes().unwrap(),
        actualized(root).node_hashes().unwrap()
    );
}

#[test]
fn test_generated_file_in_existing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);

    fs::write(root.join("src/lib/b.rs"), "pub fn b() {}").unwrap();
    assert!(TreeActualizer::default()
        .actualize_when_single_file_generated(&mut tree, root, "src/lib/b.rs")
        .unwrap());
    assert_matches_full(&tree, root);
}

#[test]
fn test_modified_file() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);

    fs::write(root.join("README"), "changed").unwrap();
    assert!(TreeActualizer::default()
        .actualize_when_single_file_generated(&mut tree, root, "README")
        .unwrap());
    assert_matches_full(&tree, root);
}

#[test]
fn test_generated_file_in_new_nested_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);

    write_files(root, &[("gen/classes/pkg/A.class", "bytecode")]);
    TreeActualizer::default()
        .actualize_when_single_file_generated(&mut tree, root, "gen/classes/pkg/A.class")
        .unwrap();
    assert!(tree.has_directory("gen/classes").unwrap());
    assert_matches_full(&tree, root);
}

#[test]
fn test_generated_directory_with_content() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);

    write_files(root, &[("out/a", "1"), ("out/b/c", "2"), ("out/empty/", "")]);
    TreeActualizer::default()
        .actualize_when_single_file_generated(&mut tree, root, "out")
        .unwrap();
    assert_matches_full(&tree, root);
}

#[test]
fn test_deleted_file_and_emptied_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);
    let actualizer = TreeActualizer::default();

    fs::remove_file(root.join("src/main.rs")).unwrap();
    assert!(actualizer
        .actualize_when_single_file_deleted(&mut tree, root, "src/main.rs")
        .unwrap());
    assert_matches_full(&tree, root);

    fs::remove_dir_all(root.join("src/lib")).unwrap();
    assert!(actualizer
        .actualize_when_single_file_deleted(&mut tree, root, "src/lib/a.rs")
        .unwrap());
    assert!(!tree.has_directory("src/lib").unwrap());
    assert!(tree.has_directory("src").unwrap());
    assert_matches_full(&tree, root);
}

#[test]
fn test_file_replaced_by_directory_incrementally() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);

    fs::remove_file(root.join("README")).unwrap();
    write_files(root, &[("README/index.md", "docs")]);
    TreeActualizer::default()
        .actualize_when_single_file_generated(&mut tree, root, "README/index.md")
        .unwrap();
    assert!(tree.has_directory("README").unwrap());
    assert_matches_full(&tree, root);
}

#[test]
fn test_sequence_of_events() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write_files(root, BASE);
    let mut tree = actualized(root);
    let actualizer = TreeActualizer::default();

    write_files(root, &[("x/y", "1")]);
    actualizer
        .actualize_when_single_file_generated(&mut tree, root, "x/y")
        .unwrap();
    fs::write(root.join("x/y"), "2").unwrap();
    actualizer
        .actualize_when_single_file_generated(&mut tree, root, "x/y")
        .unwrap();
    fs::remove_dir(root.join("empty")).unwrap();
    actualizer
        .actualize_when_single_file_deleted(&mut tree, root, "empty")
        .unwrap();

    assert_matches_full(&tree, root);
}
