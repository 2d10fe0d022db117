//! Integration tests for output-root indexing and per-root trees

use crate::integration::test_utils::{actualized, write_files};
use hashsync::output_roots::{OutputRootIndex, OutputRootTrees, OUTPUT_ROOTS_LIST_FILENAME};
use hashsync::pipeline::SyncSettings;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_nested_roots_each_track_their_files() {
    let project = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(project.path(), &[("out/prod/", ""), ("out/test/", "")]);

    let index = OutputRootIndex::new(project.path(), ["out", "out/prod", "out/test"]);
    let mut trees = OutputRootTrees::new(index, storage.path(), SyncSettings::default()).unwrap();

    let class = project.path().join("out/prod/pkg/Main.class");
    write_files(project.path(), &[("out/prod/pkg/Main.class", "cafebabe")]);
    assert_eq!(trees.register_generated_file(&class), 2);

    let prod = trees.tree(&project.path().join("out/prod")).unwrap();
    assert!(prod.has_file("pkg/Main.class").unwrap());
    assert_eq!(
        prod.node_hashes().unwrap(),
        actualized(&project.path().join("out/prod")).node_hashes().unwrap()
    );
    let out = trees.tree(&project.path().join("out")).unwrap();
    assert!(out.has_file("prod/pkg/Main.class").unwrap());
    assert!(trees.tree(&project.path().join("out/test")).is_none());
}

#[test]
fn test_files_outside_roots_are_ignored() {
    let project = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(project.path(), &[("out/", ""), ("src/Main.java", "class Main {}")]);

    let index = OutputRootIndex::new(project.path(), ["out"]);
    let mut trees = OutputRootTrees::new(index, storage.path(), SyncSettings::default()).unwrap();
    assert_eq!(
        trees.register_generated_file(&project.path().join("src/Main.java")),
        0
    );
    assert_eq!(trees.loaded_count(), 0);
}

#[test]
fn test_saved_trees_reload_from_storage() {
    let project = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(project.path(), &[("out/a.bin", "1")]);
    let out = project.path().join("out");

    let index = OutputRootIndex::new(project.path(), ["out"]);
    let mut trees =
        OutputRootTrees::new(index.clone(), storage.path(), SyncSettings::default()).unwrap();
    trees.files_generated([(out.as_path(), ".")]);
    assert_eq!(trees.save_all(), 0);

    let list = trees.storage_dir().join(OUTPUT_ROOTS_LIST_FILENAME);
    assert_eq!(fs::read_to_string(&list).unwrap(), "out\n");
    let reloaded_index = OutputRootIndex::load(&list, project.path()).unwrap();
    assert_eq!(reloaded_index.output_roots(), index.output_roots());

    // A fresh instance loads the stored tree and sees no change for an unchanged file
    let mut fresh =
        OutputRootTrees::new(reloaded_index, storage.path(), SyncSettings::default()).unwrap();
    assert_eq!(fresh.register_generated_file(&out.join("a.bin")), 0);
    assert!(fresh.tree(&out).unwrap().has_file("a.bin").unwrap());

    fs::write(out.join("a.bin"), "2").unwrap();
    assert_eq!(fresh.register_generated_file(&out.join("a.bin")), 1);
}

#[test]
fn test_storage_prefix_names_companion_files() {
    let project = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(project.path(), &[("build/x", "1")]);

    let index = OutputRootIndex::new(project.path(), ["build"]);
    let mut trees = OutputRootTrees::new(index, storage.path(), SyncSettings::default()).unwrap();
    trees.register_generated_file(&project.path().join("build/x"));
    trees.save_all();

    let prefix = OutputRootIndex::storage_prefix("build");
    assert!(trees.storage_dir().join(format!("{}.hashes", prefix)).exists());
    assert!(trees.storage_dir().join(format!("{}.tree", prefix)).exists());
}
