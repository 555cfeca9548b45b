//! Sorting out the exported library's `libs/` folder

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{DeployError, Result};
use super::fsops;

/// Jar the Unity player cannot run without; always stays in the library
pub const UNITY_CLASSES_JAR: &str = "unity-classes.jar";

pub fn default_keep() -> Vec<String> {
    vec![UNITY_CLASSES_JAR.to_string()]
}

pub fn default_delete() -> Vec<String> {
    vec![
        "unitylibrary-debug.aar".to_string(),
        "rtmp-client-3.2.0.aar".to_string(),
    ]
}

pub fn default_move_extensions() -> Vec<String> {
    vec!["jar".to_string(), "aar".to_string()]
}

/// Name-based rules for `organize-libs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibsRules {
    /// Left in place
    #[serde(default = "default_keep")]
    pub keep: Vec<String>,

    /// Deleted outright
    #[serde(default = "default_delete")]
    pub delete: Vec<String>,

    /// Extensions (without the dot) of files moved to the app's libs
    #[serde(default = "default_move_extensions")]
    pub move_extensions: Vec<String>,
}

impl Default for LibsRules {
    fn default() -> Self {
        Self {
            keep: default_keep(),
            delete: default_delete(),
            move_extensions: default_move_extensions(),
        }
    }
}

impl LibsRules {
    fn should_move(&self, name: &str) -> bool {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        !ext.is_empty()
            && self
                .move_extensions
                .iter()
                .any(|m| m.trim_start_matches('.') == ext)
    }
}

/// What happened to each entry of `libs/`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LibsReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
    pub moved: Vec<String>,
    /// Same-named files removed from the destination before moving
    pub replaced: Vec<String>,
}

impl LibsReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "deleted {}, kept {}",
            self.deleted.len(),
            self.kept.len()
        );
        if !self.moved.is_empty() || !self.replaced.is_empty() {
            summary.push_str(&format!(
                ", moved {} ({} replaced)",
                self.moved.len(),
                self.replaced.len()
            ));
        }
        summary
    }
}

/// Delete, keep, or move each file of `libs_dir` according to `rules`.
///
/// Subdirectories and files matching no rule are left alone. Moved files
/// first evict same-named files from `app_libs_dir`, which is created when
/// missing.
pub fn organize(libs_dir: &Path, app_libs_dir: &Path, rules: &LibsRules) -> Result<LibsReport> {
    fsops::require_dir(libs_dir)?;

    if !app_libs_dir.exists() {
        fs::create_dir_all(app_libs_dir).map_err(|e| DeployError::io("create", app_libs_dir, e))?;
        debug!(path = %app_libs_dir.display(), "created app libs folder");
    }

    let mut report = LibsReport::default();
    let mut to_move: Vec<(String, PathBuf)> = Vec::new();

    for path in fsops::sorted_entries(libs_dir)? {
        if path.is_dir() {
            continue;
        }
        let name = fsops::file_name(&path);

        if rules.delete.contains(&name) {
            fsops::remove_path(&path)?;
            report.deleted.push(name);
        } else if rules.keep.contains(&name) {
            report.kept.push(name);
        } else if rules.should_move(&name) {
            to_move.push((name, path));
        }
    }

    for (name, _) in &to_move {
        if fsops::remove_path(&app_libs_dir.join(name))? {
            report.replaced.push(name.clone());
        }
    }

    for (name, src) in to_move {
        fsops::move_file(&src, &app_libs_dir.join(&name))?;
        report.moved.push(name);
    }

    Ok(report)
}

/// Delete every entry of `libs_dir` except the names in `keep`
pub fn prune(libs_dir: &Path, keep: &[String]) -> Result<LibsReport> {
    fsops::require_dir(libs_dir)?;

    let mut report = LibsReport::default();
    for path in fsops::sorted_entries(libs_dir)? {
        let name = fsops::file_name(&path);
        if keep.contains(&name) {
            report.kept.push(name);
        } else {
            fsops::remove_path(&path)?;
            report.deleted.push(name);
        }
    }
    Ok(report)
}

/// Names left in `libs_dir` that a finished `organize` would not leave there
pub fn organize_leftovers(libs_dir: &Path, rules: &LibsRules) -> Result<Vec<String>> {
    let mut leftovers = Vec::new();
    for path in fsops::sorted_entries(libs_dir)? {
        if path.is_dir() {
            continue;
        }
        let name = fsops::file_name(&path);
        if rules.keep.contains(&name) {
            continue;
        }
        if rules.delete.contains(&name) || rules.should_move(&name) {
            leftovers.push(name);
        }
    }
    Ok(leftovers)
}

/// Names left in `libs_dir` other than `keep`
pub fn prune_leftovers(libs_dir: &Path, keep: &[String]) -> Result<Vec<String>> {
    Ok(fsops::sorted_entries(libs_dir)?
        .iter()
        .map(|p| fsops::file_name(p))
        .filter(|name| !keep.contains(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn exported_libs(root: &Path) -> PathBuf {
        let libs = root.join("unityLibrary/libs");
        touch(&libs.join("unity-classes.jar"), "classes");
        touch(&libs.join("unitylibrary-debug.aar"), "debug");
        touch(&libs.join("rtmp-client-3.2.0.aar"), "rtmp");
        touch(&libs.join("bluetooth.aar"), "bt-new");
        touch(&libs.join("gson.jar"), "gson");
        touch(&libs.join("README.txt"), "notes");
        fs::create_dir_all(libs.join("arm64-v8a")).unwrap();
        libs
    }

    #[test]
    fn test_organize_moves_and_replaces() {
        let tmp = tempdir().unwrap();
        let libs = exported_libs(tmp.path());
        let app_libs = tmp.path().join("app/libs");
        touch(&app_libs.join("bluetooth.aar"), "bt-old");
        touch(&app_libs.join("other.aar"), "untouched");

        let report = organize(&libs, &app_libs, &LibsRules::default()).unwrap();

        assert_eq!(
            report.deleted,
            vec!["rtmp-client-3.2.0.aar", "unitylibrary-debug.aar"]
        );
        assert_eq!(report.kept, vec!["unity-classes.jar"]);
        assert_eq!(report.moved, vec!["bluetooth.aar", "gson.jar"]);
        assert_eq!(report.replaced, vec!["bluetooth.aar"]);

        assert_eq!(fs::read_to_string(app_libs.join("bluetooth.aar")).unwrap(), "bt-new");
        assert_eq!(fs::read_to_string(app_libs.join("other.aar")).unwrap(), "untouched");
        assert!(libs.join("unity-classes.jar").exists());
        assert!(libs.join("README.txt").exists());
        assert!(libs.join("arm64-v8a").is_dir());
        assert!(!libs.join("gson.jar").exists());

        assert!(organize_leftovers(&libs, &LibsRules::default()).unwrap().is_empty());
    }

    #[test]
    fn test_organize_creates_app_libs() {
        let tmp = tempdir().unwrap();
        let libs = exported_libs(tmp.path());
        let app_libs = tmp.path().join("app/libs");

        organize(&libs, &app_libs, &LibsRules::default()).unwrap();

        assert!(app_libs.join("gson.jar").exists());
    }

    #[test]
    fn test_organize_requires_libs_dir() {
        let tmp = tempdir().unwrap();
        let err = organize(
            &tmp.path().join("missing"),
            &tmp.path().join("app/libs"),
            &LibsRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DeployError::NotFound(_)));
    }

    #[test]
    fn test_extension_with_leading_dot() {
        let rules = LibsRules {
            move_extensions: vec![".aar".to_string()],
            ..LibsRules::default()
        };
        assert!(rules.should_move("x.aar"));
        assert!(!rules.should_move("x.jar"));
        assert!(!rules.should_move("aar"));
    }

    #[test]
    fn test_prune_keeps_only_named() {
        let tmp = tempdir().unwrap();
        let libs = exported_libs(tmp.path());

        let report = prune(&libs, &default_keep()).unwrap();

        assert_eq!(report.kept, vec!["unity-classes.jar"]);
        assert_eq!(report.deleted.len(), 6);
        let left: Vec<_> = fs::read_dir(&libs).unwrap().flatten().collect();
        assert_eq!(left.len(), 1);
        assert!(prune_leftovers(&libs, &default_keep()).unwrap().is_empty());
    }

    #[test]
    fn test_summary() {
        let report = LibsReport {
            deleted: vec!["a".into()],
            kept: vec!["b".into()],
            moved: vec!["c".into(), "d".into()],
            replaced: vec!["c".into()],
        };
        assert_eq!(report.summary(), "deleted 1, kept 1, moved 2 (1 replaced)");
    }
}
