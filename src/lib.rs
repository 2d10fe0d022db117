//! hashsync: incremental content-hashed directory trees
//!
//! A directory is mirrored by a persisted hashtree in which every node carries
//! a digest of its name and content. Trees are kept current by full or
//! single-path actualization, compared to produce created/deleted/changed
//! path sets, and those differences are applied to another directory from a
//! tar archive or a source directory.

pub mod apply;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod logging;
pub mod output_roots;
pub mod pipeline;
pub mod store;
pub mod tree;
pub mod watch;
