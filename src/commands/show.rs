//! Show command - Print a profile's resolved layout and steps

use anyhow::Result;
use owo_colors::OwoColorize;
use std::fmt::Write;

use crate::config::Profile;
use crate::unity::Pipeline;

/// Execute the show command, returning the rendered profile
pub fn execute(name: &str, profile: &Profile, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(profile)?);
    }

    let layout = profile.layout(None)?;
    let pipeline = Pipeline::new(name, &layout, &profile.steps)?;

    let mut out = String::new();
    writeln!(out, "{}", format!("=== Profile: {} ===", name).green())?;
    writeln!(out, "Project dir:  {}", layout.project_dir.display())?;
    writeln!(out, "New library:  {}", layout.new_library.display())?;
    writeln!(out, "Library:      {}", layout.library().display())?;
    writeln!(out, "Backup:       {}", layout.backup().display())?;
    if let Some(dir) = &layout.app_libs_dir {
        writeln!(out, "App libs:     {}", dir.display())?;
    }
    if let Some(dir) = &layout.archive_dir {
        writeln!(out, "Archive dir:  {}", dir.display())?;
    }
    if !profile.manifest_templates.is_empty() {
        writeln!(out, "Manifest templates:")?;
        for (template, path) in &profile.manifest_templates {
            let selected = layout.manifest_template.as_deref() == Some(path.as_path());
            let marker = if selected { "*" } else { " " };
            writeln!(out, "  {} {} -> {}", marker, template, path.display())?;
        }
    }

    writeln!(out)?;
    write!(out, "Steps:")?;
    for (i, description) in pipeline.plan().iter().enumerate() {
        write!(out, "\n  {:>2}. {}", i + 1, description)?;
    }
    if profile.steps.is_empty() {
        write!(out, "\n  {}", "(none)".yellow())?;
    }
    Ok(out)
}
