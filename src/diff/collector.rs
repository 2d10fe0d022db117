//! Accumulates the result of a tree comparison

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Created, deleted and changed paths from one comparison
///
/// Sets are ordered so that listings and serialized output are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDifferenceCollector {
    created: BTreeSet<String>,
    deleted: BTreeSet<String>,
    changed: BTreeSet<String>,
}

impl TreeDifferenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_created(&mut self, path: impl Into<String>) {
        self.created.insert(path.into());
    }

    pub fn add_deleted(&mut self, path: impl Into<String>) {
        self.deleted.insert(path.into());
    }

    pub fn add_changed(&mut self, path: impl Into<String>) {
        self.changed.insert(path.into());
    }

    pub fn created(&self) -> &BTreeSet<String> {
        &self.created
    }

    pub fn deleted(&self) -> &BTreeSet<String> {
        &self.deleted
    }

    pub fn changed(&self) -> &BTreeSet<String> {
        &self.changed
    }

    /// Whether applying this difference needs any content from an archive
    pub fn has_created_or_changed(&self) -> bool {
        !self.created.is_empty() || !self.changed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }

    /// Total number of recorded paths
    pub fn len(&self) -> usize {
        self.created.len() + self.deleted.len() + self.changed.len()
    }

    /// One-line summary of the set sizes
    pub fn sizes(&self) -> String {
        format!(
            "Created: {}, deleted: {}, changed: {}",
            self.created.len(),
            self.deleted.len(),
            self.changed.len()
        )
    }
}

impl fmt::Display for TreeDifferenceCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.sizes())?;
        for path in &self.created {
            writeln!(f, "  + {}", path)?;
        }
        for path in &self.deleted {
            writeln!(f, "  - {}", path)?;
        }
        for path in &self.changed {
            writeln!(f, "  ~ {}", path)?;
        }
        Ok(())
    }
}
