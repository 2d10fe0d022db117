//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to pipeline stages.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands};
pub use presentation::{
    format_actualize_json, format_actualize_text, format_apply_json, format_apply_report_text,
    format_difference_json, format_difference_text, format_status_json, format_status_text,
    format_sync_summary_json, format_sync_summary_text,
};
pub use route::RunContext;
