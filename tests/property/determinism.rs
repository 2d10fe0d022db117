//! Property-based tests for hashing and path determinism

use hashsync::tree::path;
use hashsync::tree::{HashAlgorithm, HashedFileTree, NodeHasher, TreeActualizer, TreeSettings};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Small directory layouts: relative file path → content
pub fn layout() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    let segment = "[a-e]{1,2}";
    let file_path = prop::collection::vec(segment, 1..4).prop_map(|segments| segments.join("/"));
    prop::collection::btree_map(file_path, prop::collection::vec(any::<u8>(), 0..32), 0..8)
        .prop_map(drop_conflicts)
}

/// Remove files whose path is a directory of another file
fn drop_conflicts(files: BTreeMap<String, Vec<u8>>) -> BTreeMap<String, Vec<u8>> {
    let paths: Vec<String> = files.keys().cloned().collect();
    files
        .into_iter()
        .filter(|(file, _)| {
            let prefix = format!("{}/", file);
            !paths.iter().any(|other| other.starts_with(&prefix))
        })
        .collect()
}

pub fn materialize(root: &Path, files: &BTreeMap<String, Vec<u8>>) {
    for (file, content) in files {
        let location = root.join(file);
        fs::create_dir_all(location.parent().unwrap()).unwrap();
        fs::write(location, content).unwrap();
    }
}

pub fn actualized(root: &Path) -> HashedFileTree {
    let mut tree = HashedFileTree::in_memory(TreeSettings::strict()).unwrap();
    TreeActualizer::default().actualize(&mut tree, root).unwrap();
    tree
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_independent_trees_agree(files in layout()) {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        materialize(first.path(), &files);
        materialize(second.path(), &files);

        prop_assert_eq!(
            actualized(first.path()).node_hashes().unwrap(),
            actualized(second.path()).node_hashes().unwrap()
        );
    }

    #[test]
    fn prop_reactualize_is_idempotent(files in layout()) {
        let dir = TempDir::new().unwrap();
        materialize(dir.path(), &files);

        let mut tree = actualized(dir.path());
        let before = tree.node_hashes().unwrap();
        let changed = TreeActualizer::default().actualize(&mut tree, dir.path()).unwrap();
        prop_assert!(!changed);
        prop_assert_eq!(tree.node_hashes().unwrap(), before);
    }

    #[test]
    fn prop_hash_string_is_stable(content in ".*") {
        for algorithm in [HashAlgorithm::Sha1, HashAlgorithm::Md5, HashAlgorithm::Blake3] {
            let hasher = NodeHasher::with_algorithm(algorithm);
            let digest = hasher.hash_string(&content);
            prop_assert_eq!(&digest, &hasher.hash_string(&content));
            prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn prop_normalize_is_idempotent(raw in "[a-c./\\\\]{0,12}") {
        let once = path::normalize(&raw);
        prop_assert_eq!(path::normalize(&once), once.clone());
        prop_assert!(!once.starts_with("./"));
        prop_assert!(!once.ends_with('/'));
    }
}
