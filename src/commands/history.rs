//! History command - Show recent deploy and restore runs

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use std::path::Path;

use super::utils;
use crate::unity::history::History;
use crate::unity::pipeline::Status;

/// Execute the history command, returning the rendered table
pub fn execute(history_db: &Path, profile: Option<&str>, limit: usize) -> Result<String> {
    if !history_db.exists() {
        return Ok("No deployments recorded yet.".to_string());
    }

    let history = History::open(history_db)
        .with_context(|| format!("Failed to open history: {}", history_db.display()))?;
    let entries = history.recent(profile, limit)?;
    if entries.is_empty() {
        return Ok("No deployments recorded yet.".to_string());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Started"),
        Cell::new("Profile"),
        Cell::new("Action"),
        Cell::new("Status"),
        Cell::new("Steps"),
        Cell::new("Duration"),
        Cell::new("Run"),
    ]);

    for entry in &entries {
        let color = match entry.status {
            Status::Ok => Color::Green,
            _ => Color::Red,
        };
        let status = match entry.failed_step() {
            Some(step) => format!("failed at {} ({})", step.index + 1, step.kind),
            None => entry.status.to_string(),
        };
        let done = entry
            .steps
            .iter()
            .filter(|s| s.status == Status::Ok)
            .count();

        table.add_row(vec![
            Cell::new(utils::format_timestamp(entry.started_at)),
            Cell::new(&entry.profile),
            Cell::new(&entry.action),
            Cell::new(status).fg(color),
            Cell::new(format!("{}/{}", done, entry.steps.len())),
            Cell::new(format!("{}s", entry.finished_at - entry.started_at)),
            Cell::new(entry.run_id.get(..8).unwrap_or(&entry.run_id)),
        ]);
    }

    let mut output = table.to_string();
    output.push_str(&format!("\n\nShowing {} most recent runs", entries.len()));
    Ok(output)
}
