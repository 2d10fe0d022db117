//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key: defaults, then the global
/// file, then the workspace files, then an explicit `--config` file, then the
/// environment.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("storage.backend", "file")?
        .set_default("hashing.algorithm", "sha1")?
        .set_default("tree.strict", false)?
        .set_default("logging.level", "info")
}
