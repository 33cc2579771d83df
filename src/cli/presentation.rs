//! CLI presentation: text rendering of command results.

use crate::fsck::FsckSummary;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;

/// Record counts for one repo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoStats {
    pub repo: String,
    pub branches: usize,
    pub commits: usize,
    pub branches_without_head: usize,
}

pub fn format_stats_text(stats: &[RepoStats]) -> String {
    if stats.is_empty() {
        return "No repos found.".to_string();
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Repo", "Branches", "Commits", "Branches without head"]);
    for s in stats {
        table.add_row(vec![
            Cell::new(&s.repo),
            Cell::new(s.branches),
            Cell::new(s.commits),
            Cell::new(s.branches_without_head),
        ]);
    }
    table.to_string()
}

pub fn format_fsck_summary_text(summary: &FsckSummary) -> String {
    let mut text = format!(
        "checked {} repos, {} branches, {} commits: ",
        summary.repos, summary.branches, summary.commits
    );
    if summary.is_clean() {
        text.push_str("no consistency errors");
    } else {
        text.push_str(&format!("{} consistency errors", summary.violations));
    }
    if let Some(repair) = &summary.repair {
        text.push_str(&format!(
            "\nrepair: {} commits created, {} already present",
            repair.created.len(),
            repair.already_present.len()
        ));
    }
    text
}
