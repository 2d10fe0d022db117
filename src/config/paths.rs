//! Well-known locations: global config file, workspace config directory, default storage

use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

/// Per-workspace directory holding config.toml (and the fallback storage)
pub const WORKSPACE_DIR: &str = ".hashsync";

/// $XDG_CONFIG_HOME/hashsync/config.toml, falling back to the platform config dir
pub fn global_config_path() -> Option<PathBuf> {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => BaseDirs::new()?.config_dir().to_path_buf(),
    };
    Some(config_home.join("hashsync").join("config.toml"))
}

pub fn workspace_config_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(WORKSPACE_DIR)
}

/// Stable short identifier of a workspace, derived from its canonical path
pub fn workspace_id(workspace_root: &Path) -> String {
    let canonical = dunce::canonicalize(workspace_root).unwrap_or_else(|_| workspace_root.to_path_buf());
    let digest = blake3::hash(canonical.to_string_lossy().as_bytes());
    digest.to_hex()[..16].to_string()
}

/// Default hashtree storage: <data dir>/hashsync/workspaces/<id>, or
/// `<workspace>/.hashsync/storage` when no data dir is known
pub fn default_storage_dir(workspace_root: &Path) -> PathBuf {
    match ProjectDirs::from("", "", "hashsync") {
        Some(dirs) => dirs
            .data_dir()
            .join("workspaces")
            .join(workspace_id(workspace_root)),
        None => workspace_config_dir(workspace_root).join("storage"),
    }
}
