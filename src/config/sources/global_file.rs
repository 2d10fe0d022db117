//! Global config file source: $XDG_CONFIG_HOME/hashsync/config.toml

use crate::config::paths;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use tracing::debug;

/// Add global config file source to builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(global_path) = paths::global_config_path() else {
        return Ok(builder);
    };

    if global_path.exists() {
        let canonical = dunce::canonicalize(&global_path).unwrap_or(global_path);
        Ok(builder.add_source(File::from(canonical).required(false)))
    } else {
        debug!(config_path = %global_path.display(), "No global configuration file");
        Ok(builder)
    }
}
