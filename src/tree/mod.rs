//! Hashed File Tree
//!
//! Represents a directory as a Merkle-style tree keyed by project-relative
//! path, where each file or directory carries a hash derived from its name
//! and content (files) or its children's hashes (directories).

pub mod actualizer;
pub mod hashed;
pub mod hasher;
pub mod path;
pub mod walker;

pub use actualizer::TreeActualizer;
pub use hashed::{HashedFileTree, LoadStatus, INITIAL_DIRECTORY_HASH};
pub use hasher::{HashAlgorithm, HashProvider, NodeHasher};

use serde::{Deserialize, Serialize};

/// Behavioral switches threaded through tree construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSettings {
    /// Check structural preconditions (double add, missing parent, removal of
    /// absent nodes, reads of uncomputed directory hashes) and fail the
    /// operation when one is violated. Off by default.
    #[serde(default)]
    pub strict: bool,
}

impl TreeSettings {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}
