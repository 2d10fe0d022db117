//! Integration tests for compare → pack → apply round-trips

use crate::integration::test_utils::{snapshot, write_files};
use hashsync::apply::{apply_difference, pack_difference, pack_directory, TarArchive};
use hashsync::diff::TreeDifferenceCollector;
use hashsync::pipeline::{
    actualize_storage, apply_archive_file, compare_and_apply, compare_storages, sync_directories,
    SyncSettings,
};
use std::fs;
use tempfile::TempDir;

const OLD: &[(&str, &str)] = &[
    ("a/x", "1"),
    ("a/y", "2"),
    ("b", "3"),
    ("p", "file"),
    ("d/x", "4"),
    ("d/sub/y", "5"),
    ("stale/", ""),
];

const NEW: &[(&str, &str)] = &[
    ("a/x", "9"),
    ("a/y", "2"),
    ("c", "4"),
    ("p/q", "nested"),
    ("d", "now a file"),
    ("fresh/", ""),
    ("fresh/deeper/z", "z"),
];

struct Fixture {
    old: TempDir,
    new: TempDir,
    storage: TempDir,
    settings: SyncSettings,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            old: TempDir::new().unwrap(),
            new: TempDir::new().unwrap(),
            storage: TempDir::new().unwrap(),
            settings: SyncSettings::default(),
        };
        write_files(fixture.old.path(), OLD);
        write_files(fixture.new.path(), NEW);
        actualize_storage(fixture.old.path(), fixture.storage.path(), "old", &fixture.settings)
            .unwrap();
        actualize_storage(fixture.new.path(), fixture.storage.path(), "new", &fixture.settings)
            .unwrap();
        fixture
    }

    fn difference(&self) -> TreeDifferenceCollector {
        compare_storages(
            self.storage.path(),
            "old",
            self.storage.path(),
            "new",
            &self.settings,
        )
        .unwrap()
    }
}

#[test]
fn test_tar_roundtrip_reproduces_new_directory() {
    let fixture = Fixture::new();
    let difference = fixture.difference();
    let archive = fixture.storage.path().join("update.tar");
    let packed = pack_difference(fixture.new.path(), &difference, &archive).unwrap();
    assert_eq!(packed, difference.created().len() + difference.changed().len());

    let report = apply_archive_file(&archive, fixture.old.path(), &difference).unwrap();
    assert!(report.is_success());
    assert_eq!(snapshot(fixture.old.path()), snapshot(fixture.new.path()));
}

#[test]
fn test_compare_and_apply_then_reactualize_matches() {
    let fixture = Fixture::new();
    let archive = fixture.storage.path().join("full.tar");
    pack_directory(fixture.new.path(), &archive).unwrap();

    let (difference, report) = compare_and_apply(
        fixture.storage.path(),
        "old",
        fixture.storage.path(),
        "new",
        &archive,
        fixture.old.path(),
        &fixture.settings,
    )
    .unwrap();
    assert!(!difference.is_empty());
    assert_eq!(report.failed, 0);

    let old = actualize_storage(fixture.old.path(), fixture.storage.path(), "old", &fixture.settings)
        .unwrap();
    let new = actualize_storage(fixture.new.path(), fixture.storage.path(), "new", &fixture.settings)
        .unwrap();
    assert_eq!(old.root_hash, new.root_hash);
    assert!(fixture.difference().is_empty());
}

#[test]
fn test_apply_is_idempotent() {
    let fixture = Fixture::new();
    let difference = fixture.difference();
    let archive = fixture.storage.path().join("update.tar");
    pack_difference(fixture.new.path(), &difference, &archive).unwrap();
    let tar = TarArchive::open(&archive).unwrap();

    let first = apply_difference(&difference, &tar, fixture.old.path());
    assert!(first.is_success());
    let second = apply_difference(&difference, &tar, fixture.old.path());
    assert!(second.is_success());
    assert_eq!(snapshot(fixture.old.path()), snapshot(fixture.new.path()));
}

#[test]
fn test_sync_directories_end_to_end() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    write_files(source.path(), NEW);
    write_files(target.path(), OLD);

    let summary = sync_directories(
        source.path(),
        target.path(),
        storage.path(),
        &SyncSettings::default(),
    )
    .unwrap();
    assert!(summary.report.is_success());
    assert!(summary.difference.changed().contains("a/x"));
    assert_eq!(snapshot(target.path()), snapshot(source.path()));

    // Nothing left to do on a second run
    let again = sync_directories(
        source.path(),
        target.path(),
        storage.path(),
        &SyncSettings::default(),
    )
    .unwrap();
    assert!(again.difference.is_empty());
    assert!(!again.target.root_changed);
}

#[test]
fn test_deletions_only_need_no_archive() {
    let target = TempDir::new().unwrap();
    write_files(target.path(), &[("keep", "k"), ("drop/inner", "x")]);
    let mut difference = TreeDifferenceCollector::new();
    difference.add_deleted("drop/inner");

    let report = apply_archive_file(
        &target.path().join("absent.tar"),
        target.path(),
        &difference,
    )
    .unwrap();
    assert_eq!(report.applied, 1);
    assert!(!target.path().join("drop/inner").exists());
    assert!(fs::read_to_string(target.path().join("keep")).is_ok());
}
