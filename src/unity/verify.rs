//! Post-deploy checks
//!
//! Each step is turned back into an expectation about the finished tree and
//! compared using MD5 fingerprints.

use std::fs;
use std::path::Path;

use super::error::{DeployError, Result};
use super::fsops;
use super::gradle;
use super::layout::Layout;
use super::libs;
use super::manifest;
use super::steps::{self, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

/// Result of checking one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn pass(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            detail: detail.into(),
        }
    }

    fn fail(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            detail: detail.into(),
        }
    }

    fn skip(detail: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Skip,
            detail: detail.into(),
        }
    }

    fn expect(ok: bool, pass: impl Into<String>, fail: impl Into<String>) -> Self {
        if ok {
            Self::pass(pass)
        } else {
            Self::fail(fail)
        }
    }
}

/// MD5 of a file's bytes as lowercase hex
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| DeployError::io("read", path, e))?;
    Ok(format!("{:x}", md5::compute(bytes)))
}

/// MD5 over every file's relative path and digest, in name order
pub fn tree_digest(dir: &Path) -> Result<String> {
    fsops::require_dir(dir)?;

    let mut listing = String::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            DeployError::io("walk", path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let relative: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        listing.push_str(&relative.join("/"));
        listing.push(':');
        listing.push_str(&file_digest(entry.path())?);
        listing.push('\n');
    }
    Ok(format!("{:x}", md5::compute(listing)))
}

fn same_file(a: &Path, b: &Path) -> Result<Check> {
    for path in [a, b] {
        if !path.is_file() {
            return Ok(Check::fail(format!("{} is missing", path.display())));
        }
    }
    let (da, db) = (file_digest(a)?, file_digest(b)?);
    Ok(Check::expect(
        da == db,
        format!("md5 {da}"),
        format!("md5 {da} != {db}"),
    ))
}

fn same_tree(a: &Path, b: &Path) -> Result<Check> {
    for path in [a, b] {
        if !path.is_dir() {
            return Ok(Check::fail(format!("{} is missing", path.display())));
        }
    }
    let (da, db) = (tree_digest(a)?, tree_digest(b)?);
    Ok(Check::expect(
        da == db,
        format!("tree md5 {da}"),
        format!("tree md5 {da} != {db}"),
    ))
}

/// Check that the tree reflects what `step` should have done
pub fn check(step: &Step, layout: &Layout) -> Result<Check> {
    let lib = layout.library();
    let bak = layout.backup();

    let check = match step {
        Step::CleanBackup => match &layout.archive_dir {
            None => Check::skip("no archive_dir configured"),
            Some(dir) => {
                let prefix = format!("{}-", layout.backup_name);
                let found = dir.is_dir()
                    && fsops::sorted_entries(dir)?.iter().any(|p| {
                        let name = fsops::file_name(p);
                        name.starts_with(&prefix) && name.ends_with(".tar.gz")
                    });
                Check::expect(
                    found,
                    format!("archive present in {}", dir.display()),
                    format!("no {prefix}*.tar.gz in {}", dir.display()),
                )
            }
        },
        Step::Backup => Check::expect(
            bak.is_dir(),
            format!("{} present", layout.backup_name),
            format!("{} is missing", bak.display()),
        ),
        Step::CopyLibrary => Check::expect(
            lib.is_dir(),
            format!("{} present", layout.library_name),
            format!("{} is missing", lib.display()),
        ),
        Step::OrganizeLibs(rules) => {
            let libs_dir = layout.libs_dir();
            if !libs_dir.is_dir() {
                return Ok(Check::fail(format!("{} is missing", libs_dir.display())));
            }
            let left = libs::organize_leftovers(&libs_dir, rules)?;
            Check::expect(
                left.is_empty(),
                "libs organized",
                format!("left behind: {}", left.join(", ")),
            )
        }
        Step::PruneLibs { keep } => {
            let libs_dir = layout.libs_dir();
            if !libs_dir.is_dir() {
                return Ok(Check::fail(format!("{} is missing", libs_dir.display())));
            }
            let left = libs::prune_leftovers(&libs_dir, keep)?;
            Check::expect(
                left.is_empty(),
                format!("only {} remain", keep.join(", ")),
                format!("unexpected: {}", left.join(", ")),
            )
        }
        Step::ReplaceBuildGradle => {
            same_file(&Layout::build_gradle(&lib), &Layout::build_gradle(&bak))?
        }
        Step::MergeBuildGradle => {
            let old_path = Layout::build_gradle(&bak);
            let old = fsops::read_text(&old_path)?;
            let new = fsops::read_text(&Layout::build_gradle(&lib))?;
            let head =
                gradle::head_through_android(&old).map_err(|e| steps::block_error(e, &old_path))?;
            Check::expect(
                new.starts_with(head),
                format!("android block from {}", layout.backup_name),
                format!("head differs from {}", layout.backup_name),
            )
        }
        Step::ReplaceManifest => match &layout.manifest_template {
            Some(template) => same_file(&Layout::manifest(&lib), template)?,
            None => Check::skip("no manifest template selected"),
        },
        Step::MergeManifestActivity => {
            let old = fsops::read_text(&Layout::manifest(&bak))?;
            let new = fsops::read_text(&Layout::manifest(&lib))?;
            match (manifest::first_activity(&old), manifest::first_activity(&new)) {
                (Some(a), Some(b)) => Check::expect(
                    a == b,
                    "activity matches backup",
                    "activity differs from backup",
                ),
                (None, _) => Check::skip("backup manifest has no activity"),
                (Some(_), None) => Check::fail("no activity in manifest"),
            }
        }
        Step::CommentManifestActivity => {
            let content = fsops::read_text(&Layout::manifest(&lib))?;
            let live = manifest::live_activity_count(&content);
            Check::expect(
                live == 0,
                "all activities commented out",
                format!("{live} live activity element(s)"),
            )
        }
        Step::ReplaceDirContents { path } | Step::CarryDir { path } => {
            same_tree(&lib.join(path), &bak.join(path))?
        }
        Step::CarryFile { path } => same_file(&lib.join(path), &bak.join(path))?,
    };
    Ok(check)
}
