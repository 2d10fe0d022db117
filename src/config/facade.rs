//! Layered configuration loader

use crate::config::{merge, sources, HashsyncConfig};
use config::{ConfigError, File};
use std::path::Path;

/// Loads [`HashsyncConfig`] from every source in precedence order
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then environment
    pub fn load(workspace_root: &Path) -> Result<HashsyncConfig, ConfigError> {
        Self::load_with_file(workspace_root, None)
    }

    /// Like [`Self::load`], with an explicit file layered above the workspace files.
    /// The explicit file must exist.
    pub fn load_with_file(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<HashsyncConfig, ConfigError> {
        let mut builder = merge::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = sources::environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }
}
