//! Archive command - Snapshot a library into a tarball

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use super::utils;
use crate::config::Profile;
use crate::unity::archive;

/// Execute the archive command. Returns the written archive path.
pub fn execute(name: &str, profile: &Profile, output: Option<&str>, backup: bool) -> Result<PathBuf> {
    let layout = profile.layout(None)?;
    let (source, dir_name) = if backup {
        (layout.backup(), &layout.backup_name)
    } else {
        (layout.library(), &layout.library_name)
    };

    let dest = match output {
        Some(file) => archive::with_archive_extension(file),
        None => {
            let dir = layout.archive_dir.clone().unwrap_or_else(|| PathBuf::from("."));
            archive::default_archive_path(&dir, dir_name)
        }
    };

    println!("Archiving: {}", source.display());
    let size = archive::write_archive(&source, &dest, Some(name))
        .with_context(|| format!("Failed to archive {}", source.display()))?;

    println!(
        "{} {} ({})",
        "Created:".green(),
        dest.display(),
        utils::format_size(size)
    );
    Ok(dest)
}
