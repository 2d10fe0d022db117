//! CLI parse: clap types for hashsync. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hashsync CLI - Incremental directory hashtrees, tree diff and archive apply
#[derive(Parser)]
#[command(name = "hashsync")]
#[command(about = "Keep content-hashed directory trees and synchronize directories by their difference")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (layered on top of global and workspace files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (used when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bring a stored hashtree up to date with a directory
    Actualize {
        /// Directory to hash (relative to the workspace)
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Storage prefix of the tree
        #[arg(long, default_value = "tree")]
        prefix: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Compare two stored hashtrees
    Compare {
        /// Prefix of the old tree
        #[arg(long)]
        old_prefix: String,
        /// Prefix of the new tree
        #[arg(long)]
        new_prefix: String,
        /// Storage directory of the old tree (default: configured storage)
        #[arg(long)]
        old_storage: Option<PathBuf>,
        /// Storage directory of the new tree (default: configured storage)
        #[arg(long)]
        new_storage: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Pack a directory, or only what changed between two trees, into a tar archive
    Pack {
        /// Directory whose files are packed
        source: PathBuf,
        /// Archive file to write
        archive: PathBuf,
        /// Pack only the difference from this stored tree...
        #[arg(long, requires = "new_prefix")]
        old_prefix: Option<String>,
        /// ...to this stored tree
        #[arg(long, requires = "old_prefix")]
        new_prefix: Option<String>,
    },
    /// Compare two stored trees and apply the difference to a directory
    Apply {
        /// Tar archive or directory holding the new content
        archive: PathBuf,
        /// Directory the difference is applied to
        target: PathBuf,
        /// Prefix of the old tree (the target's current state)
        #[arg(long)]
        old_prefix: String,
        /// Prefix of the new tree
        #[arg(long)]
        new_prefix: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Make one directory a copy of another, touching only what differs
    Sync {
        source: PathBuf,
        target: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the stored tree and what changed on disk since it was saved
    Status {
        /// Directory the tree mirrors
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Storage prefix of the tree
        #[arg(long, default_value = "tree")]
        prefix: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Keep a stored tree in step with a directory until interrupted
    Watch {
        /// Directory to watch
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Storage prefix of the tree
        #[arg(long, default_value = "tree")]
        prefix: String,
        /// Quiet period in milliseconds before a batch of events is applied
        #[arg(long, default_value = "200")]
        batch_window_ms: u64,
    },
    /// Configuration commands (show, validate)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Check the effective configuration
    Validate,
}
