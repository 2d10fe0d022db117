//! Configuration System
//!
//! Hierarchical configuration: built-in defaults, a global file, workspace
//! files and `HASHSYNC__*` environment variables, merged by the `config`
//! crate and deserialized into [`HashsyncConfig`].

use crate::logging::LoggingConfig;
use crate::pipeline::SyncSettings;
use crate::store::StorageBackend;
use crate::tree::{HashAlgorithm, TreeSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
pub mod paths;
mod sources;

pub use facade::ConfigLoader;
pub use sources::environment::{ENV_PREFIX, ENV_SEPARATOR};
pub use sources::workspace_file::ENV_NAME_VAR;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashsyncConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub hashing: HashingConfig,

    #[serde(default)]
    pub tree: TreeSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where hashtrees are persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage directory; relative paths are taken from the workspace root.
    /// Unset means the per-workspace data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingConfig {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
}

impl HashsyncConfig {
    /// Resolved storage directory for `workspace_root`
    pub fn storage_dir(&self, workspace_root: &Path) -> PathBuf {
        match &self.storage.dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => workspace_root.join(dir),
            None => paths::default_storage_dir(workspace_root),
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            algorithm: self.hashing.algorithm,
            backend: self.storage.backend,
            tree: self.tree,
        }
    }

    /// Check the configuration. Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Some(dir) = &self.storage.dir {
            if dir.as_os_str().is_empty() {
                errors.push("storage.dir cannot be empty".to_string());
            }
        }

        if self.storage.backend == StorageBackend::Memory {
            errors.push("storage.backend 'memory' does not persist hashtrees".to_string());
        }

        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(format!(
                "logging.level '{}' must be one of {}",
                self.logging.level,
                LEVELS.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
