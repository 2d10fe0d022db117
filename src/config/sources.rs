//! Configuration sources, in increasing precedence

pub mod environment;
pub mod global_file;
pub mod workspace_file;
