//! Workspace config file source: .hashsync/config.toml and .hashsync/{env}.toml

use crate::config::paths;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Selects the environment-specific workspace file
pub const ENV_NAME_VAR: &str = "HASHSYNC_ENV";

/// Add workspace config files to builder.
/// Precedence: .hashsync/config.toml (base) then .hashsync/{HASHSYNC_ENV}.toml.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = paths::workspace_config_dir(workspace_root);
    let mut builder = builder;

    let base_config_path = config_dir.join("config.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    if let Ok(env_name) = std::env::var(ENV_NAME_VAR) {
        let env_config_path = config_dir.join(format!("{}.toml", env_name));
        if env_config_path.exists() {
            builder = builder.add_source(File::from(env_config_path).required(false));
        }
    }

    Ok(builder)
}
