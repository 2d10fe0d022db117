//! Tree presentation: actualize and status results in text/json.

use crate::cli::presentation::difference::difference_table;
use crate::pipeline::{ActualizeSummary, StatusReport};
use serde_json::json;

pub fn format_actualize_text(summary: &ActualizeSummary) -> String {
    let state = if summary.root_changed {
        "updated"
    } else {
        "unchanged"
    };
    format!(
        "Hashtree {}\nRoot hash: {}\nNodes: {} ({} directories)",
        state, summary.root_hash, summary.nodes, summary.directories
    )
}

pub fn format_actualize_json(summary: &ActualizeSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_status_text(report: &StatusReport) -> String {
    let mut output = match &report.stored_root_hash {
        Some(hash) => format!(
            "Stored root hash: {}\nStored nodes: {} ({} directories)\n",
            hash, report.stored_nodes, report.stored_directories
        ),
        None => "No stored hashtree yet.\n".to_string(),
    };

    if report.pending.is_empty() {
        output.push_str("\nUp to date.");
    } else {
        output.push_str(&format!(
            "\nPending changes:\n{}\n\n{}",
            difference_table(&report.pending),
            report.pending.sizes()
        ));
    }
    output
}

pub fn format_status_json(report: &StatusReport) -> String {
    let out = json!({
        "stored": {
            "root_hash": report.stored_root_hash,
            "nodes": report.stored_nodes,
            "directories": report.stored_directories,
        },
        "pending": report.pending,
        "up_to_date": report.pending.is_empty(),
    });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
}
