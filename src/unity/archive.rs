//! Gzipped tarball snapshots of a library directory

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::Builder;

use super::error::{DeployError, Result};
use super::fsops;

/// Archive metadata stored as `manifest.json`
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ArchiveManifest {
    /// Version of the archive format
    pub version: u32,
    /// Directory that was archived
    pub source_path: String,
    /// Name of the archived directory, also its prefix inside the archive
    pub library_name: String,
    /// Profile that requested the archive, if any
    pub profile: Option<String>,
    /// Timestamp of archive creation
    pub created_at: i64,
}

/// `<dir>/<name>-<YYYYmmdd-HHMMSS>.tar.gz`
pub fn default_archive_path(dir: &Path, name: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{name}-{stamp}.tar.gz"))
}

/// Append `.tar.gz` unless already present
pub fn with_archive_extension(file: &str) -> PathBuf {
    if file.ends_with(".tar.gz") {
        PathBuf::from(file)
    } else {
        PathBuf::from(format!("{file}.tar.gz"))
    }
}

/// Write `source` into a gzip tarball at `dest`. Returns the archive size.
pub fn write_archive(source: &Path, dest: &Path, profile: Option<&str>) -> Result<u64> {
    fsops::require_dir(source)?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DeployError::io("create", parent, e))?;
    }

    let library_name = fsops::file_name(source);
    let manifest = ArchiveManifest {
        version: 1,
        source_path: source.to_string_lossy().to_string(),
        library_name: library_name.clone(),
        profile: profile.map(str::to_string),
        created_at: chrono::Utc::now().timestamp(),
    };

    let file = File::create(dest).map_err(|e| DeployError::io("create", dest, e))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = Builder::new(encoder);

    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    add_file_to_archive(&mut archive, "manifest.json", manifest_json.as_bytes())
        .map_err(|e| DeployError::io("write", dest, e))?;
    if let Err(e) = add_dir_to_archive(&mut archive, source, &library_name) {
        drop(archive);
        let _ = fs::remove_file(dest);
        return Err(DeployError::io("archive", source, e));
    }

    let encoder = archive
        .into_inner()
        .map_err(|e| DeployError::io("write", dest, e))?;
    encoder
        .finish()
        .map_err(|e| DeployError::io("write", dest, e))?;

    let size = fs::metadata(dest)
        .map_err(|e| DeployError::io("read", dest, e))?
        .len();
    Ok(size)
}

/// Add a file with content to the archive
fn add_file_to_archive<W: Write>(
    archive: &mut Builder<W>,
    name: &str,
    content: &[u8],
) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    header.set_cksum();

    archive.append_data(&mut header, name, content)
}

/// Add a directory recursively to the archive.
///
/// Symlinks are stored as links, not followed. Walk errors and entries that
/// are neither file, directory nor symlink abort the archive.
fn add_dir_to_archive<W: Write>(
    archive: &mut Builder<W>,
    source: &Path,
    prefix: &str,
) -> std::io::Result<()> {
    for entry in walkdir::WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(source) else {
            continue;
        };

        let archive_path = if relative.as_os_str().is_empty() {
            PathBuf::from(prefix)
        } else {
            PathBuf::from(prefix).join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(path)?;
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            archive.append_link(&mut header, &archive_path, &target)?;
        } else if file_type.is_dir() {
            archive.append_dir(&archive_path, path)?;
        } else if file_type.is_file() {
            archive.append_path_with_name(path, &archive_path)?;
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("cannot archive special file {}", path.display()),
            ));
        }
    }
    Ok(())
}
