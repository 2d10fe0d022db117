//! Output roots: directories synchronized as independent hashtrees
//!
//! [`OutputRootIndex`] knows the set of roots and maps a file to the roots
//! that contain it. [`OutputRootTrees`] keeps one lazily loaded tree per root
//! and feeds single-file events into it.

use crate::pipeline::SyncSettings;
use crate::tree::{path, HashedFileTree, LoadStatus, TreeActualizer};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};

/// Storage subdirectory holding every output-root tree
pub const OUTPUT_ROOTS_STORAGE_DIR: &str = "output-roots";
/// File listing the indexed roots, one project-relative path per line
pub const OUTPUT_ROOTS_LIST_FILENAME: &str = "roots.list";

/// Resolve `.` and `..` components without touching the filesystem
fn lexical(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Canonical form of `path`; the part that does not exist yet is appended lexically
fn canonical(path: &Path) -> PathBuf {
    let absolute = lexical(path);
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = dunce::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, segment| acc.join(segment));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// Set of output roots of a project
#[derive(Debug, Clone)]
pub struct OutputRootIndex {
    project_base: PathBuf,
    roots: BTreeSet<PathBuf>,
}

impl OutputRootIndex {
    /// Index the given roots; relative roots are taken relative to `project_base`
    pub fn new<I, P>(project_base: &Path, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let project_base = canonical(project_base);
        let roots = roots
            .into_iter()
            .map(|root| canonical(&project_base.join(root.as_ref())))
            .collect();
        Self {
            project_base,
            roots,
        }
    }

    /// Read a roots list written by [`Self::save_to_file`]. Blank lines are skipped.
    pub fn load(list_file: &Path, project_base: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(list_file)?;
        let roots: Vec<&str> = content
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        Ok(Self::new(project_base, roots))
    }

    pub fn save_to_file(&self, list_file: &Path) -> io::Result<()> {
        if let Some(parent) = list_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(fs::File::create(list_file)?);
        for root in &self.roots {
            writeln!(out, "{}", self.relative_root(root))?;
        }
        out.flush()
    }

    pub fn project_base(&self) -> &Path {
        &self.project_base
    }

    pub fn output_roots(&self) -> Vec<PathBuf> {
        self.roots.iter().cloned().collect()
    }

    /// Project-relative tree path of a root; roots outside the project keep their full path
    pub fn relative_root(&self, root: &Path) -> String {
        path::relative_to(&self.project_base, root)
            .unwrap_or_else(|| root.to_string_lossy().into_owned())
    }

    /// Every root that is `file` itself or one of its ancestors, innermost first
    pub fn roots_for_file(&self, file: &Path) -> Vec<PathBuf> {
        let file = canonical(file);
        file.ancestors()
            .filter(|candidate| self.roots.contains(*candidate))
            .map(Path::to_path_buf)
            .collect()
    }

    /// Stable storage prefix for a root given by its project-relative path
    pub fn storage_prefix(relative_root: &str) -> String {
        let digest = blake3::hash(path::normalize(relative_root).as_bytes());
        format!("outputroot_{}", &digest.to_hex()[..16])
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Generated,
    Deleted,
}

/// One hashtree per output root, loaded on first use
pub struct OutputRootTrees {
    index: OutputRootIndex,
    storage_dir: PathBuf,
    settings: SyncSettings,
    actualizer: TreeActualizer,
    trees: BTreeMap<PathBuf, HashedFileTree>,
}

impl OutputRootTrees {
    /// Trees are stored under `<data_storage_root>/output-roots`
    pub fn new(
        index: OutputRootIndex,
        data_storage_root: &Path,
        settings: SyncSettings,
    ) -> io::Result<Self> {
        let storage_dir = data_storage_root.join(OUTPUT_ROOTS_STORAGE_DIR);
        fs::create_dir_all(&storage_dir)?;
        Ok(Self {
            index,
            storage_dir,
            actualizer: settings.actualizer(),
            settings,
            trees: BTreeMap::new(),
        })
    }

    pub fn index(&self) -> &OutputRootIndex {
        &self.index
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Number of trees currently held in memory
    pub fn loaded_count(&self) -> usize {
        self.trees.len()
    }

    pub fn tree(&self, root: &Path) -> Option<&HashedFileTree> {
        self.trees.get(&canonical(root))
    }

    /// A file was created or modified under one or more roots.
    /// Returns the number of trees that changed.
    pub fn register_generated_file(&mut self, file: &Path) -> usize {
        self.update(file, Event::Generated)
    }

    /// A file was deleted under one or more roots.
    /// Returns the number of trees that changed.
    pub fn register_deleted_file(&mut self, file: &Path) -> usize {
        self.update(file, Event::Deleted)
    }

    /// Batch of generated files, each given as (root, path relative to the root)
    pub fn files_generated<'a, I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = (&'a Path, &'a str)>,
    {
        files
            .into_iter()
            .map(|(root, relative)| {
                let file = if path::normalize(relative) == path::ROOT {
                    root.to_path_buf()
                } else {
                    root.join(relative)
                };
                self.register_generated_file(&file)
            })
            .sum()
    }

    pub fn files_deleted<'a, I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = &'a Path>,
    {
        files
            .into_iter()
            .map(|file| self.register_deleted_file(file))
            .sum()
    }

    fn update(&mut self, file: &Path, event: Event) -> usize {
        let file = canonical(file);
        let mut changed = 0;
        for root in self.index.roots_for_file(&file) {
            let Some(relative) = path::relative_to(&root, &file) else {
                continue;
            };
            if !self.trees.contains_key(&root) {
                match self.load_tree(&root) {
                    Some(tree) => {
                        self.trees.insert(root.clone(), tree);
                    }
                    None => continue,
                }
            }
            let Some(tree) = self.trees.get_mut(&root) else {
                continue;
            };

            let result = match event {
                Event::Generated => {
                    self.actualizer
                        .actualize_when_single_file_generated(tree, &root, &relative)
                }
                Event::Deleted => {
                    self.actualizer
                        .actualize_when_single_file_deleted(tree, &root, &relative)
                }
            };
            match result {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => error!(root = %root.display(), path = %relative, error = %e, "Failed to actualize hashtree"),
            }
        }
        changed
    }

    fn load_tree(&self, root: &Path) -> Option<HashedFileTree> {
        let prefix = OutputRootIndex::storage_prefix(&self.index.relative_root(root));
        let mut tree = match HashedFileTree::open(
            &self.storage_dir,
            &prefix,
            self.settings.backend,
            self.settings.tree,
        ) {
            Ok(tree) => tree,
            Err(e) => {
                error!(root = %root.display(), error = %e, "Failed to open hashtree");
                return None;
            }
        };

        match tree.load() {
            Ok(LoadStatus::Loaded) => {}
            Ok(LoadStatus::NotFound) => info!(
                "Hashtree storage file is missing and will be created at saving ({} in {})",
                prefix,
                self.storage_dir.display()
            ),
            Err(e) => error!(root = %root.display(), error = %e, "Failed to load hashtree"),
        }
        Some(tree)
    }

    /// Write the roots list and every loaded tree, then release them.
    /// Returns the number of failed writes.
    pub fn save_all(&mut self) -> usize {
        let mut failures = 0;
        let list_file = self.storage_dir.join(OUTPUT_ROOTS_LIST_FILENAME);
        if let Err(e) = self.index.save_to_file(&list_file) {
            error!(error = %e, "Failed to save list of output roots");
            failures += 1;
        }

        for (root, mut tree) in std::mem::take(&mut self.trees) {
            match tree.save() {
                Ok(()) => debug!(root = %root.display(), "Saved output root hashtree"),
                Err(e) => {
                    error!(root = %root.display(), error = %e, "Failed to save hashtree for output root");
                    failures += 1;
                }
            }
        }
        failures
    }
}
