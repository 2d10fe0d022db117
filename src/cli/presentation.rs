//! CLI presentation: text and json formatters per command family.

mod difference;
mod tree;

pub use difference::{
    format_apply_json, format_apply_report_text, format_difference_json, format_difference_text,
    format_sync_summary_json, format_sync_summary_text,
};
pub use tree::{
    format_actualize_json, format_actualize_text, format_status_json, format_status_text,
};
