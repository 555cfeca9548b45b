//! Filesystem primitives the merge steps are built from
//!
//! Every operation that overwrites does so by deleting the target first and
//! then copying, so a step can be re-run after the tree has been restored.

use fs_extra::dir::{self, CopyOptions};
use fs_extra::file;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{DeployError, Result};

/// Fail unless `path` is an existing directory
pub fn require_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DeployError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(DeployError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Fail unless `path` is an existing regular file
pub fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DeployError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(DeployError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Remove a file or a whole directory tree. Returns whether anything existed.
pub fn remove_path(path: &Path) -> Result<bool> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(false);
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| DeployError::io("remove", path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| DeployError::io("remove", path, e))?;
    }
    debug!(path = %path.display(), "removed");
    Ok(true)
}

/// Remove every child of `dir_path`, keeping the directory itself
pub fn clear_dir(dir_path: &Path) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for entry in sorted_entries(dir_path)? {
        remove_path(&entry)?;
        removed.push(file_name(&entry));
    }
    Ok(removed)
}

/// Copy a directory recursively to `dst`, which must not exist yet
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    let options = CopyOptions::new().copy_inside(true);
    dir::copy(src, dst, &options).map_err(|e| DeployError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    debug!(from = %src.display(), to = %dst.display(), "copied directory");
    Ok(())
}

/// Copy directory contents into an existing directory (merge)
pub fn copy_dir_contents(src: &Path, dst: &Path) -> Result<()> {
    let options = CopyOptions::new().content_only(true).overwrite(true);
    dir::copy(src, dst, &options).map_err(|e| DeployError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    debug!(from = %src.display(), to = %dst.display(), "copied directory contents");
    Ok(())
}

/// Copy `src` into `parent` under its own name, replacing an existing entry.
///
/// Returns the destination path.
pub fn copy_dir_into(src: &Path, parent: &Path) -> Result<PathBuf> {
    require_dir(src)?;
    require_dir(parent)?;

    let dst = parent.join(src.file_name().ok_or_else(|| DeployError::NotADirectory(src.into()))?);
    if remove_path(&dst)? {
        debug!(path = %dst.display(), "replacing existing directory");
    }
    copy_dir(src, &dst)?;
    Ok(dst)
}

/// Copy a directory to an exact destination path, replacing what is there
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    require_dir(src)?;
    remove_path(dst)?;
    copy_dir(src, dst)
}

/// Copy a file into `folder` (created if missing), replacing a same-named file.
///
/// A same-named directory in the way is an error rather than something to delete.
pub fn copy_file_into(src: &Path, folder: &Path) -> Result<PathBuf> {
    require_file(src)?;

    if !folder.exists() {
        fs::create_dir_all(folder).map_err(|e| DeployError::io("create", folder, e))?;
        debug!(path = %folder.display(), "created folder");
    }

    let name = src.file_name().ok_or_else(|| DeployError::NotAFile(src.into()))?;
    let dst = folder.join(name);
    if dst.is_dir() {
        return Err(DeployError::NotAFile(dst));
    }
    copy_file(src, &dst)?;
    Ok(dst)
}

/// Copy a file to an exact destination path, replacing what is there
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if dst.is_file() {
        fs::remove_file(dst).map_err(|e| DeployError::io("remove", dst, e))?;
    }
    fs::copy(src, dst).map_err(|e| DeployError::io("copy", src, e))?;
    debug!(from = %src.display(), to = %dst.display(), "copied file");
    Ok(())
}

/// Move a file, falling back to copy + delete across filesystems
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    let options = file::CopyOptions::new().overwrite(true);
    file::move_file(src, dst, &options).map_err(|e| DeployError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    debug!(from = %src.display(), to = %dst.display(), "moved file");
    Ok(())
}

/// Rename a directory, deleting whatever already sits at `to`
pub fn rename_dir(from: &Path, to: &Path) -> Result<()> {
    require_dir(from)?;
    if remove_path(to)? {
        debug!(path = %to.display(), "target existed, deleted first");
    }

    // rename fails across filesystems, copy instead
    if fs::rename(from, to).is_err() {
        copy_dir(from, to)?;
        fs::remove_dir_all(from).map_err(|e| DeployError::io("remove", from, e))?;
    }
    debug!(from = %from.display(), to = %to.display(), "renamed directory");
    Ok(())
}

/// Read a UTF-8 text file
pub fn read_text(path: &Path) -> Result<String> {
    require_file(path)?;
    fs::read_to_string(path).map_err(|e| DeployError::io("read", path, e))
}

/// Write a text file, replacing its content
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| DeployError::io("write", path, e))
}

/// Entries of a directory sorted by name
pub fn sorted_entries(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir_path)
        .map_err(|e| DeployError::io("read", dir_path, e))?
        .flatten()
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Final component of a path as an owned string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
