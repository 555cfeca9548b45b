//! Restore command - Put the backup library back in place

use anyhow::{bail, Result};
use owo_colors::OwoColorize;
use std::path::Path;

use super::{deploy, utils};
use crate::config::Profile;
use crate::unity::pipeline;

/// Execute the restore command
pub fn execute(name: &str, profile: &Profile, yes: bool, history_db: &Path) -> Result<()> {
    let layout = profile.layout(None)?;
    let library = layout.library();
    let backup = layout.backup();

    if !backup.is_dir() {
        bail!("No backup to restore: {} does not exist", backup.display());
    }

    println!("{}", format!("=== Restore: {} ===", name).green());
    utils::print_exists_status(&layout.library_name, &library);
    utils::print_exists_status(&layout.backup_name, &backup);
    println!();
    println!(
        "{} {} will be deleted and replaced by {}",
        "Note:".yellow(),
        library.display(),
        layout.backup_name
    );

    if !yes && !utils::confirm("Proceed with restore?")? {
        println!("Aborted.");
        return Ok(());
    }

    let report = pipeline::restore(name, &layout);
    deploy::record(history_db, &report);

    match report.failed_step() {
        Some(failed) => bail!("Restore failed: {}", failed.message),
        None => {
            println!("{} {}", "Restored:".green(), library.display());
            Ok(())
        }
    }
}
