//! Shared utilities for commands

use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::path::Path;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Unix seconds as local `YYYY-mm-dd HH:MM`
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Ask a yes/no question on stdin; anything but `y` means no
pub fn confirm(question: &str) -> Result<bool> {
    print!("{} (y/N) ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Print whether a path exists, e.g. `  unityLibrary: exists`
pub fn print_exists_status(label: &str, path: &Path) {
    if path.exists() {
        println!("  {}: {} ({})", label, "exists".green(), path.display());
    } else {
        println!("  {}: {} ({})", label, "missing".yellow(), path.display());
    }
}
