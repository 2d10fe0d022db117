//! Integration tests for persisting trees with every storage backend

use crate::integration::test_utils::{actualized, write_files};
use hashsync::store::{hashes_file_name, tree_file_name, StorageBackend};
use hashsync::tree::{HashAlgorithm, HashedFileTree, LoadStatus, TreeActualizer, TreeSettings};
use tempfile::TempDir;

fn persisted(backend: StorageBackend) {
    let work = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(work.path(), &[("a/b", "1"), ("c", "2"), ("e/", "")]);

    let mut tree =
        HashedFileTree::open(storage.path(), "tree", backend, TreeSettings::default()).unwrap();
    assert_eq!(tree.load().unwrap(), LoadStatus::NotFound);
    TreeActualizer::default()
        .actualize(&mut tree, work.path())
        .unwrap();
    tree.save().unwrap();
    let expected = tree.node_hashes().unwrap();
    drop(tree);

    assert!(storage.path().join(hashes_file_name("tree")).exists());
    assert!(storage.path().join(tree_file_name("tree")).exists());

    let mut reloaded =
        HashedFileTree::open(storage.path(), "tree", backend, TreeSettings::default()).unwrap();
    assert_eq!(reloaded.load().unwrap(), LoadStatus::Loaded);
    assert_eq!(reloaded.node_hashes().unwrap(), expected);
    assert_eq!(reloaded.nodes_count(), 5);
    assert_eq!(reloaded.algorithm().unwrap(), Some(HashAlgorithm::Sha1));
    assert_eq!(reloaded.directories_count(), 3);
    assert_eq!(expected, actualized(work.path()).node_hashes().unwrap());
}

#[test]
fn test_file_backend_persists() {
    persisted(StorageBackend::File);
}

#[test]
fn test_sled_backend_persists() {
    persisted(StorageBackend::Sled);
}

#[test]
fn test_prefixes_are_independent() {
    let work = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(work.path(), &[("f", "1")]);

    let mut first =
        HashedFileTree::open(storage.path(), "one", StorageBackend::File, TreeSettings::default())
            .unwrap();
    TreeActualizer::default()
        .actualize(&mut first, work.path())
        .unwrap();
    first.save().unwrap();

    let mut second =
        HashedFileTree::open(storage.path(), "two", StorageBackend::File, TreeSettings::default())
            .unwrap();
    assert_eq!(second.load().unwrap(), LoadStatus::NotFound);
    assert_eq!(second.root_hash().unwrap(), None);
}

#[test]
fn test_memory_backend_keeps_nothing_on_disk() {
    let storage = TempDir::new().unwrap();
    let mut tree = HashedFileTree::open(
        storage.path(),
        "mem",
        StorageBackend::Memory,
        TreeSettings::default(),
    )
    .unwrap();
    tree.load().unwrap();
    assert_eq!(tree.root_hash().unwrap(), None);
    assert!(tree.save().is_ok());
    assert!(!storage.path().join(hashes_file_name("mem")).exists());
}
