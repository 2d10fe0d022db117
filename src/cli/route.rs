//! CLI route: single route table and run context. Dispatches to pipeline stages and presentation.

use crate::apply::{pack_difference, pack_directory};
use crate::cli::command_name;
use crate::cli::parse::{Commands, ConfigCommands};
use crate::cli::presentation::{
    format_actualize_json, format_actualize_text, format_apply_json, format_apply_report_text,
    format_difference_json, format_difference_text, format_status_json, format_status_text,
    format_sync_summary_json, format_sync_summary_text,
};
use crate::config::{ConfigLoader, HashsyncConfig};
use crate::error::SyncError;
use crate::pipeline::{self, SyncSettings};
use crate::watch::{WatchConfig, WatchDaemon};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span};

/// Runtime context for CLI execution: workspace, effective configuration and storage location.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: HashsyncConfig,
    storage_dir: PathBuf,
    settings: SyncSettings,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, SyncError> {
        let config = ConfigLoader::load_with_file(&workspace_root, config_path.as_deref())?;
        let storage_dir = config.storage_dir(&workspace_root);
        let settings = config.sync_settings();
        Ok(Self {
            workspace_root,
            config,
            storage_dir,
            settings,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn config(&self) -> &HashsyncConfig {
        &self.config
    }

    /// Paths given on the command line are taken relative to the workspace root
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn storage_or_default(&self, dir: &Option<PathBuf>) -> PathBuf {
        dir.as_deref()
            .map(|d| self.resolve(d))
            .unwrap_or_else(|| self.storage_dir.clone())
    }

    /// Execute a command and return its rendered output
    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        let name = command_name(command);
        let _span = info_span!("command", name = %name).entered();
        let start = Instant::now();

        let result = self.route(command);
        info!(
            ok = result.is_ok(),
            "Command {} finished in {:.2} sec",
            name,
            start.elapsed().as_secs_f64()
        );
        result
    }

    fn route(&self, command: &Commands) -> Result<String, SyncError> {
        match command {
            Commands::Actualize {
                dir,
                prefix,
                format,
            } => {
                let summary =
                    pipeline::actualize_storage(&self.resolve(dir), &self.storage_dir, prefix, &self.settings)?;
                Ok(if format == "json" {
                    format_actualize_json(&summary)
                } else {
                    format_actualize_text(&summary)
                })
            }
            Commands::Compare {
                old_prefix,
                new_prefix,
                old_storage,
                new_storage,
                format,
            } => {
                let difference = pipeline::compare_storages(
                    &self.storage_or_default(old_storage),
                    old_prefix,
                    &self.storage_or_default(new_storage),
                    new_prefix,
                    &self.settings,
                )?;
                Ok(if format == "json" {
                    format_difference_json(&difference)
                } else {
                    format_difference_text(&difference)
                })
            }
            Commands::Pack {
                source,
                archive,
                old_prefix,
                new_prefix,
            } => self.handle_pack(
                &self.resolve(source),
                &self.resolve(archive),
                old_prefix.as_deref().zip(new_prefix.as_deref()),
            ),
            Commands::Apply {
                archive,
                target,
                old_prefix,
                new_prefix,
                format,
            } => {
                let (difference, report) = pipeline::compare_and_apply(
                    &self.storage_dir,
                    old_prefix,
                    &self.storage_dir,
                    new_prefix,
                    &self.resolve(archive),
                    &self.resolve(target),
                    &self.settings,
                )?;
                Ok(if format == "json" {
                    format_apply_json(&difference, &report)
                } else {
                    format!(
                        "{}\n\n{}",
                        format_difference_text(&difference),
                        format_apply_report_text(&report)
                    )
                })
            }
            Commands::Sync {
                source,
                target,
                format,
            } => {
                let summary = pipeline::sync_directories(
                    &self.resolve(source),
                    &self.resolve(target),
                    &self.storage_dir,
                    &self.settings,
                )?;
                Ok(if format == "json" {
                    format_sync_summary_json(&summary)
                } else {
                    format_sync_summary_text(&summary)
                })
            }
            Commands::Status {
                dir,
                prefix,
                format,
            } => {
                let report =
                    pipeline::status(&self.resolve(dir), &self.storage_dir, prefix, &self.settings)?;
                Ok(if format == "json" {
                    format_status_json(&report)
                } else {
                    format_status_text(&report)
                })
            }
            Commands::Watch {
                dir,
                prefix,
                batch_window_ms,
            } => self.handle_watch(&self.resolve(dir), prefix, *batch_window_ms),
            Commands::Config { command } => self.handle_config_command(command),
        }
    }

    fn handle_pack(
        &self,
        source: &Path,
        archive: &Path,
        prefixes: Option<(&str, &str)>,
    ) -> Result<String, SyncError> {
        let entries = match prefixes {
            Some((old_prefix, new_prefix)) => {
                let difference = pipeline::compare_storages(
                    &self.storage_dir,
                    old_prefix,
                    &self.storage_dir,
                    new_prefix,
                    &self.settings,
                )?;
                pack_difference(source, &difference, archive)?
            }
            None => pack_directory(source, archive)?,
        };
        Ok(format!("Packed {} entries into {}", entries, archive.display()))
    }

    fn handle_watch(&self, dir: &Path, prefix: &str, batch_window_ms: u64) -> Result<String, SyncError> {
        let mut config = WatchConfig::new(dir, &self.storage_dir, prefix);
        config.batch_window_ms = batch_window_ms;
        config.settings = self.settings;

        let mut daemon = WatchDaemon::new(config)?;
        let stop = Arc::new(AtomicBool::new(false));
        daemon.run(stop)?;
        Ok(format!("Stopped watching {}", daemon.root().display()))
    }

    fn handle_config_command(&self, command: &ConfigCommands) -> Result<String, SyncError> {
        match command {
            ConfigCommands::Show => self
                .config
                .to_toml()
                .map_err(|e| SyncError::ConfigError(e.to_string())),
            ConfigCommands::Validate => match self.config.validate() {
                Ok(()) => Ok(format!(
                    "Configuration is valid\nStorage: {}",
                    self.storage_dir.display()
                )),
                Err(errors) => Err(SyncError::ConfigError(errors.join("; "))),
            },
        }
    }
}
