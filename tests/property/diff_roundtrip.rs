//! Property-based tests for diff completeness and apply round-trips

use crate::property::determinism::{actualized, layout, materialize};
use hashsync::apply::{apply_difference, DirectoryArchive};
use hashsync::diff::TreeComparator;
use proptest::prelude::*;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Every entry under `root`; directories carry no content
fn entries(root: &std::path::Path) -> Vec<(String, Option<Vec<u8>>)> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| entry.unwrap())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            let content = entry
                .file_type()
                .is_file()
                .then(|| std::fs::read(entry.path()).unwrap());
            (relative, content)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_sets_are_disjoint_except_kind_changes(old in layout(), new in layout()) {
        let old_dir = TempDir::new().unwrap();
        let new_dir = TempDir::new().unwrap();
        materialize(old_dir.path(), &old);
        materialize(new_dir.path(), &new);
        let old_tree = actualized(old_dir.path());
        let new_tree = actualized(new_dir.path());

        let difference = TreeComparator::compare_trees(&new_tree, &old_tree).unwrap();
        for path in difference.changed() {
            prop_assert!(!difference.created().contains(path));
            prop_assert!(!difference.deleted().contains(path));
        }
        for path in difference.created().intersection(difference.deleted()) {
            // Only a node whose kind differs may appear on both sides
            prop_assert_ne!(
                new_tree.has_directory(path).unwrap(),
                old_tree.has_directory(path).unwrap()
            );
        }
    }

    #[test]
    fn prop_apply_reproduces_new_directory(old in layout(), new in layout()) {
        let old_dir = TempDir::new().unwrap();
        let new_dir = TempDir::new().unwrap();
        materialize(old_dir.path(), &old);
        materialize(new_dir.path(), &new);

        let difference = TreeComparator::compare_trees(
            &actualized(new_dir.path()),
            &actualized(old_dir.path()),
        )
        .unwrap();
        let report = apply_difference(&difference, &DirectoryArchive::new(new_dir.path()), old_dir.path());
        prop_assert_eq!(report.failed, 0);
        prop_assert_eq!(entries(old_dir.path()), entries(new_dir.path()));
    }
}
