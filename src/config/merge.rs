//! Source layering for the configuration loader

pub mod merge_policy;

pub use merge_policy::builder_with_defaults;
