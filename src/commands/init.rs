//! Init command - Write a sample profile file

use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use std::fs;
use std::path::Path;

use crate::config::SAMPLE_CONFIG;

/// Execute the init command
pub fn execute(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(config_path, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write: {}", config_path.display()))?;

    println!("{} {}", "Created:".green(), config_path.display());
    println!("Edit the profile paths, then run `unity-deploy list`.");
    Ok(())
}
