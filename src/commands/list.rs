//! List command - Show configured profiles

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};

use crate::config::Config;

fn presence(exists: bool) -> &'static str {
    if exists {
        "yes"
    } else {
        "-"
    }
}

/// Execute the list command, returning the rendered table
pub fn execute(config: &Config) -> Result<String> {
    if config.profiles.is_empty() {
        return Ok("No profiles configured.".to_string());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Profile"),
        Cell::new("Project"),
        Cell::new("Steps"),
        Cell::new("Library"),
        Cell::new("Backup"),
        Cell::new("New export"),
    ]);

    for (name, profile) in &config.profiles {
        let project = &profile.project_dir;
        table.add_row(vec![
            Cell::new(name),
            Cell::new(project.display()),
            Cell::new(profile.steps.len()),
            Cell::new(presence(project.join(&profile.library_name).is_dir())),
            Cell::new(presence(project.join(&profile.backup_name).is_dir())),
            Cell::new(presence(profile.new_library.is_dir())),
        ]);
    }

    let mut output = table.to_string();
    output.push_str(&format!("\n\n{} profiles configured", config.profiles.len()));
    Ok(output)
}
