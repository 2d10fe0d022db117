//! Integration tests for hash determinism across independent trees

use crate::integration::test_utils::{actualized, write_files};
use hashsync::tree::{HashAlgorithm, HashedFileTree, NodeHasher, TreeActualizer, TreeSettings};
use std::fs;
use tempfile::TempDir;

const LAYOUT: &[(&str, &str)] = &[
    ("file1.txt", "content1"),
    ("file2.txt", "content2"),
    ("dir1/file3.txt", "content3"),
    ("dir1/nested/file4.txt", "content4"),
    ("empty/", ""),
];

/// Two byte-identical directories produce identical hashes at every path
#[test]
fn test_identical_directories_identical_hashes() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_files(first.path(), LAYOUT);
    write_files(second.path(), LAYOUT);

    let a = actualized(first.path());
    let b = actualized(second.path());
    assert_eq!(a.node_hashes().unwrap(), b.node_hashes().unwrap());
    assert_eq!(a.nodes_count(), 8);
}

/// Creation order on disk does not influence hashes
#[test]
fn test_creation_order_irrelevant() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_files(first.path(), LAYOUT);
    let reversed: Vec<_> = LAYOUT.iter().rev().copied().collect();
    write_files(second.path(), &reversed);

    assert_eq!(
        actualized(first.path()).root_hash().unwrap(),
        actualized(second.path()).root_hash().unwrap()
    );
}

/// File content changes produce a different root hash
#[test]
fn test_content_change_changes_root() {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), LAYOUT);
    let before = actualized(temp_dir.path()).root_hash().unwrap();

    fs::write(temp_dir.path().join("dir1/nested/file4.txt"), "other").unwrap();
    assert_ne!(actualized(temp_dir.path()).root_hash().unwrap(), before);
}

/// Renaming a file with unchanged content changes its hash: names are hashed
#[test]
fn test_rename_changes_hash() {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), &[("a.txt", "same")]);
    let before = actualized(temp_dir.path());

    fs::rename(temp_dir.path().join("a.txt"), temp_dir.path().join("b.txt")).unwrap();
    let after = actualized(temp_dir.path());
    assert_ne!(before.root_hash().unwrap(), after.root_hash().unwrap());
    assert_ne!(
        before.get_hash("a.txt").unwrap(),
        after.get_hash("b.txt").unwrap()
    );
}

/// Empty directories are part of the tree and of the hash
#[test]
fn test_empty_directory_contributes() {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), &[("f", "x")]);
    let before = actualized(temp_dir.path()).root_hash().unwrap();

    fs::create_dir(temp_dir.path().join("empty")).unwrap();
    let after = actualized(temp_dir.path());
    assert!(after.has_directory("empty").unwrap());
    assert_ne!(after.root_hash().unwrap(), before);
}

/// Hash strings follow the name-then-content concatenation for every algorithm
#[test]
fn test_hash_layout_per_algorithm() {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), &[("f", "hello")]);

    for algorithm in [HashAlgorithm::Sha1, HashAlgorithm::Md5, HashAlgorithm::Blake3] {
        let hasher = NodeHasher::with_algorithm(algorithm);
        let mut tree = HashedFileTree::in_memory(TreeSettings::strict()).unwrap();
        TreeActualizer::new(NodeHasher::with_algorithm(algorithm))
            .actualize(&mut tree, temp_dir.path())
            .unwrap();

        let file_hash = hasher.hash_string("f") + &hasher.hash_string("hello");
        assert_eq!(tree.get_hash("f").unwrap(), file_hash);
        let root_hash = hasher.hash_string(".") + &hasher.hash_string(&file_hash);
        assert_eq!(tree.root_hash().unwrap(), Some(root_hash));
    }
}
