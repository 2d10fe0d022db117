//! Integration tests for repeated actualization against persisted storage

use crate::integration::test_utils::write_files;
use hashsync::pipeline::{actualize_storage, SyncSettings};
use hashsync::store::StorageBackend;
use hashsync::tree::TreeActualizer;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_second_actualize_reports_no_change() {
    let work = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(work.path(), &[("a/x", "1"), ("a/y", "2"), ("b", "3")]);
    let settings = SyncSettings::default();

    let first = actualize_storage(work.path(), storage.path(), "w", &settings).unwrap();
    let second = actualize_storage(work.path(), storage.path(), "w", &settings).unwrap();
    assert!(first.root_changed);
    assert!(!second.root_changed);
    assert_eq!(first.root_hash, second.root_hash);
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.directories, second.directories);
}

/// Reloaded trees report nothing to do on an unchanged directory
#[test]
fn test_reloaded_tree_is_current() {
    let work = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(work.path(), &[("d/e/f", "deep"), ("top", "t"), ("empty/", "")]);

    for (backend, prefix) in [(StorageBackend::File, "file"), (StorageBackend::Sled, "sled")] {
        let settings = SyncSettings {
            backend,
            ..SyncSettings::default()
        };
        actualize_storage(work.path(), storage.path(), prefix, &settings).unwrap();

        let mut tree = settings.load_tree(storage.path(), prefix).unwrap();
        let changed = TreeActualizer::default()
            .actualize(&mut tree, work.path())
            .unwrap();
        assert!(!changed, "backend {:?} lost state across save/load", backend);
    }
}

#[test]
fn test_modification_after_save_is_detected() {
    let work = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(work.path(), &[("a/x", "1")]);
    let settings = SyncSettings::default();

    let first = actualize_storage(work.path(), storage.path(), "w", &settings).unwrap();
    fs::write(work.path().join("a/x"), "2").unwrap();
    let second = actualize_storage(work.path(), storage.path(), "w", &settings).unwrap();
    assert!(second.root_changed);
    assert_ne!(first.root_hash, second.root_hash);
}
