//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ArchiveError, SyncError};

/// Map pipeline errors to a one-line message for CLI output.
pub fn map_error(e: &SyncError) -> String {
    match e {
        SyncError::MissingStorage(dir) => format!(
            "Error: no stored hashtrees in {} (run `hashsync actualize` first)",
            dir.display()
        ),
        SyncError::Archive(ArchiveError::MissingArchive(path)) => {
            format!("Error: archive {} does not exist", path.display())
        }
        other => format!("Error: {}", other),
    }
}
