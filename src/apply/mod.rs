//! Archive-driven reconciliation of a target directory

pub mod archive;
pub mod decompress;

pub use archive::{open_archive, pack_difference, pack_directory, Archive, DirectoryArchive, EmptyArchive, TarArchive};
pub use decompress::{apply_difference, ApplyReport};
