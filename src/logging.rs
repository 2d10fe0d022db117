//! Logging System
//!
//! Structured logging on top of `tracing`. Level, format and destination come
//! from the configuration file and can be overridden through environment
//! variables or CLI flags.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directives, e.g. `debug` or `hashsync::tree=trace`
pub const LOG_ENV: &str = "HASHSYNC_LOG";
pub const LOG_FORMAT_ENV: &str = "HASHSYNC_LOG_FORMAT";
pub const LOG_OUTPUT_ENV: &str = "HASHSYNC_LOG_OUTPUT";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination: stdout, stderr, file
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, used when output is `file`
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Colored output (text format on a terminal stream only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module levels
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(".hashsync/hashsync.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: default_log_file(),
            color: default_true(),
            modules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Invalid log format: {} (must be 'json' or 'text')", other)),
        }
    }
}

/// Log destination. Stderr by default so that command output on stdout stays parseable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            other => Err(format!(
                "Invalid log output: {} (must be 'stdout', 'stderr' or 'file')",
                other
            )),
        }
    }
}

/// Initialize the global subscriber
///
/// Priority order (highest to lowest):
/// 1. Environment variables (HASHSYNC_LOG, HASHSYNC_LOG_FORMAT, HASHSYNC_LOG_OUTPUT)
/// 2. The given configuration (CLI flags are merged into it by the caller)
pub fn init_logging(config: &LoggingConfig) -> Result<(), SyncError> {
    let filter = build_env_filter(config)?;
    let format = env_override(LOG_FORMAT_ENV)?.unwrap_or(config.format);
    let output = env_override(LOG_OUTPUT_ENV)?.unwrap_or(config.output);

    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => BoxMakeWriter::new(std::sync::Mutex::new(open_log_file(&config.file)?)),
    };
    let ansi = config.color && output != LogOutput::File;

    let registry = Registry::default().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .try_init(),
    };
    result.map_err(|e| SyncError::ConfigError(format!("Failed to initialize logging: {}", e)))
}

fn open_log_file(path: &Path) -> Result<std::fs::File, SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            SyncError::ConfigError(format!("Failed to create log directory: {}", e))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SyncError::ConfigError(format!("Failed to open log file {:?}: {}", path, e)))
}

fn env_override<T: FromStr<Err = String>>(name: &str) -> Result<Option<T>, SyncError> {
    match std::env::var(name) {
        Ok(value) => value.parse().map(Some).map_err(SyncError::ConfigError),
        Err(_) => Ok(None),
    }
}

/// Build the filter from HASHSYNC_LOG or from the configured level and modules
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, SyncError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, level) in &config.modules {
        let directive = format!("{}={}", module, level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| SyncError::ConfigError(format!("Invalid log directive: {}", e)))?,
        );
    }
    Ok(filter)
}
