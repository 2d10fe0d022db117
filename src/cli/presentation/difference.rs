//! Difference presentation: compare, apply and sync results in text/json.

use crate::apply::ApplyReport;
use crate::diff::TreeDifferenceCollector;
use crate::pipeline::SyncSummary;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

/// Table of every path in the difference, one row per path
pub fn difference_table(difference: &TreeDifferenceCollector) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Change", "Path"]);
    for path in difference.created() {
        table.add_row(vec!["created", path.as_str()]);
    }
    for path in difference.deleted() {
        table.add_row(vec!["deleted", path.as_str()]);
    }
    for path in difference.changed() {
        table.add_row(vec!["changed", path.as_str()]);
    }
    table
}

pub fn format_difference_text(difference: &TreeDifferenceCollector) -> String {
    if difference.is_empty() {
        return "No differences.".to_string();
    }
    format!("{}\n\n{}", difference_table(difference), difference.sizes())
}

pub fn format_difference_json(difference: &TreeDifferenceCollector) -> String {
    serde_json::to_string_pretty(difference).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_apply_report_text(report: &ApplyReport) -> String {
    let mut output = format!(
        "Applied: {}, skipped: {}, failed: {}",
        report.applied, report.skipped, report.failed
    );
    if !report.is_success() {
        output.push_str("\nSome paths could not be applied; see the log for details.");
    }
    output
}

pub fn format_apply_json(difference: &TreeDifferenceCollector, report: &ApplyReport) -> String {
    let out = json!({ "difference": difference, "report": report });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_sync_summary_text(summary: &SyncSummary) -> String {
    let mut output = format_difference_text(&summary.difference);
    output.push_str("\n\n");
    output.push_str(&format_apply_report_text(&summary.report));
    output.push_str(&format!("\nTarget root hash: {}", summary.target.root_hash));
    output
}

pub fn format_sync_summary_json(summary: &SyncSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}
