//! The merge step catalogue
//!
//! Each step is one filesystem operation against a [`Layout`]. Steps are
//! deserialized from the profile's `steps` array, tagged by `kind`:
//!
//! ```toml
//! steps = [
//!     { kind = "backup" },
//!     { kind = "copy-library" },
//!     { kind = "carry-dir", path = "src/main/res/layout" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use super::archive;
use super::error::{DeployError, Result};
use super::fsops;
use super::gradle::{self, BlockError};
use super::layout::Layout;
use super::libs::{self, LibsRules};
use super::manifest;

/// One atomic operation in the deployment sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Step {
    /// Delete a stale backup library, archiving it first when configured
    CleanBackup,
    /// Rename the current library to the backup name
    Backup,
    /// Copy the new library into the project
    CopyLibrary,
    /// Move jars/aars from the library's libs into the app's libs
    OrganizeLibs(LibsRules),
    /// Delete everything from the library's libs except `keep`
    PruneLibs {
        #[serde(default = "libs::default_keep")]
        keep: Vec<String>,
    },
    /// Overwrite build.gradle with the backup's
    ReplaceBuildGradle,
    /// Backup's head and android block + new library's remainder
    MergeBuildGradle,
    /// Swap in the selected manifest template
    ReplaceManifest,
    /// Carry the backup's activity element into the new manifest
    MergeManifestActivity,
    /// Comment out the new manifest's activity elements
    CommentManifestActivity,
    /// Empty a directory and refill it from the backup
    ReplaceDirContents { path: String },
    /// Copy a directory from the backup, replacing the new one
    CarryDir { path: String },
    /// Copy a single file from the backup
    CarryFile { path: String },
}

impl Step {
    /// The `kind` tag as written in the config
    pub fn kind(&self) -> &'static str {
        match self {
            Step::CleanBackup => "clean-backup",
            Step::Backup => "backup",
            Step::CopyLibrary => "copy-library",
            Step::OrganizeLibs(_) => "organize-libs",
            Step::PruneLibs { .. } => "prune-libs",
            Step::ReplaceBuildGradle => "replace-build-gradle",
            Step::MergeBuildGradle => "merge-build-gradle",
            Step::ReplaceManifest => "replace-manifest",
            Step::MergeManifestActivity => "merge-manifest-activity",
            Step::CommentManifestActivity => "comment-manifest-activity",
            Step::ReplaceDirContents { .. } => "replace-dir-contents",
            Step::CarryDir { .. } => "carry-dir",
            Step::CarryFile { .. } => "carry-file",
        }
    }

    /// Relative path argument, for the steps that take one
    pub fn path(&self) -> Option<&str> {
        match self {
            Step::ReplaceDirContents { path } | Step::CarryDir { path } | Step::CarryFile { path } => {
                Some(path.as_str())
            }
            _ => None,
        }
    }

    /// Reject path arguments that could escape the library
    pub fn validate(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let p = Path::new(path);
        let escapes = p
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        let names_entry = p.components().any(|c| matches!(c, Component::Normal(_)));
        if path.trim().is_empty() || p.is_absolute() || escapes || !names_entry {
            return Err(DeployError::InvalidStepPath(path.to_string()));
        }
        Ok(())
    }

    /// Human-readable one-liner with resolved paths
    pub fn describe(&self, layout: &Layout) -> String {
        let lib = layout.library();
        let bak = layout.backup();
        match self {
            Step::CleanBackup => match &layout.archive_dir {
                Some(dir) => format!(
                    "Archive {} to {} and delete it",
                    bak.display(),
                    dir.display()
                ),
                None => format!("Delete old {}", bak.display()),
            },
            Step::Backup => format!("Rename {} to {}", lib.display(), bak.display()),
            Step::CopyLibrary => format!(
                "Copy {} to {}",
                layout.new_library.display(),
                lib.display()
            ),
            Step::OrganizeLibs(rules) => format!(
                "Organize {} (keep {}, delete {}, move *.{} to {})",
                layout.libs_dir().display(),
                rules.keep.join(", "),
                rules.delete.join(", "),
                rules.move_extensions.join("/*."),
                layout
                    .app_libs_dir
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<app_libs_dir unset>".to_string())
            ),
            Step::PruneLibs { keep } => format!(
                "Clear {} except {}",
                layout.libs_dir().display(),
                keep.join(", ")
            ),
            Step::ReplaceBuildGradle => format!(
                "Replace {} with {}",
                Layout::build_gradle(&lib).display(),
                Layout::build_gradle(&bak).display()
            ),
            Step::MergeBuildGradle => format!(
                "Merge {} (through android {{}}) with the rest of {}",
                Layout::build_gradle(&bak).display(),
                Layout::build_gradle(&lib).display()
            ),
            Step::ReplaceManifest => match &layout.manifest_template {
                Some(t) => format!(
                    "Replace {} with {}",
                    Layout::manifest(&lib).display(),
                    t.display()
                ),
                None => format!(
                    "Replace {} (no template selected)",
                    Layout::manifest(&lib).display()
                ),
            },
            Step::MergeManifestActivity => format!(
                "Carry <activity> from {} into {}",
                Layout::manifest(&bak).display(),
                Layout::manifest(&lib).display()
            ),
            Step::CommentManifestActivity => format!(
                "Comment out <activity> in {}",
                Layout::manifest(&lib).display()
            ),
            Step::ReplaceDirContents { path } => format!(
                "Replace contents of {} from {}",
                lib.join(path).display(),
                bak.join(path).display()
            ),
            Step::CarryDir { path } => format!(
                "Copy folder {} to {}",
                bak.join(path).display(),
                lib.join(path).display()
            ),
            Step::CarryFile { path } => format!(
                "Copy file {} to {}",
                bak.join(path).display(),
                lib.join(path).display()
            ),
        }
    }

    /// Perform the step, returning a short summary of what changed
    pub fn run(&self, layout: &Layout) -> Result<String> {
        debug!(kind = self.kind(), "running step");
        match self {
            Step::CleanBackup => clean_backup(layout),
            Step::Backup => {
                let (from, to) = (layout.library(), layout.backup());
                fsops::rename_dir(&from, &to)?;
                Ok(format!("{} -> {}", from.display(), to.display()))
            }
            Step::CopyLibrary => {
                fsops::require_dir(&layout.project_dir)?;
                fsops::replace_dir(&layout.new_library, &layout.library())?;
                Ok(format!("copied to {}", layout.library().display()))
            }
            Step::OrganizeLibs(rules) => {
                let app_libs = layout
                    .app_libs_dir
                    .as_deref()
                    .ok_or(DeployError::AppLibsDirNotSet)?;
                let report = libs::organize(&layout.libs_dir(), app_libs, rules)?;
                Ok(report.summary())
            }
            Step::PruneLibs { keep } => Ok(libs::prune(&layout.libs_dir(), keep)?.summary()),
            Step::ReplaceBuildGradle => {
                let src = Layout::build_gradle(&layout.backup());
                let dst = Layout::build_gradle(&layout.library());
                fsops::require_file(&dst)?;
                let content = fsops::read_text(&src)?;
                fsops::write_text(&dst, &content)?;
                Ok(format!("{} bytes written", content.len()))
            }
            Step::MergeBuildGradle => merge_build_gradle(layout),
            Step::ReplaceManifest => {
                let template = layout
                    .manifest_template
                    .as_deref()
                    .ok_or(DeployError::NoManifestTemplate)?;
                fsops::require_file(template)?;
                let dst = Layout::manifest(&layout.library());
                fsops::remove_path(&dst)?;
                fsops::copy_file(template, &dst)?;
                Ok(format!("from {}", template.display()))
            }
            Step::MergeManifestActivity => {
                let old_path = Layout::manifest(&layout.backup());
                let new_path = Layout::manifest(&layout.library());
                let old = fsops::read_text(&old_path)?;
                let new = fsops::read_text(&new_path)?;
                let block =
                    manifest::first_activity(&old).ok_or(DeployError::MissingActivity(old_path))?;
                let (merged, replaced) = manifest::replace_activities(&new, block);
                if replaced == 0 {
                    return Ok("no activity element in the new manifest, nothing replaced".to_string());
                }
                fsops::write_text(&new_path, &merged)?;
                Ok(format!("{replaced} activity element(s) replaced"))
            }
            Step::CommentManifestActivity => {
                let path = Layout::manifest(&layout.library());
                let content = fsops::read_text(&path)?;
                let (commented, wrapped) = manifest::comment_activities(&content);
                fsops::write_text(&path, &commented)?;
                Ok(format!("{wrapped} activity element(s) commented out"))
            }
            Step::ReplaceDirContents { path } => {
                let dst = layout.library().join(path);
                let src = layout.backup().join(path);
                fsops::require_dir(&dst)?;
                fsops::require_dir(&src)?;
                let removed = fsops::clear_dir(&dst)?;
                let copied = fsops::sorted_entries(&src)?.len();
                fsops::copy_dir_contents(&src, &dst)?;
                Ok(format!("removed {}, copied {copied}", removed.len()))
            }
            Step::CarryDir { path } => {
                let src = layout.backup().join(path);
                let parent = parent_in(&layout.library(), path);
                let dst = fsops::copy_dir_into(&src, &parent)?;
                Ok(format!("-> {}", dst.display()))
            }
            Step::CarryFile { path } => {
                let src = layout.backup().join(path);
                let parent = parent_in(&layout.library(), path);
                let dst = fsops::copy_file_into(&src, &parent)?;
                Ok(format!("-> {}", dst.display()))
            }
        }
    }
}

/// Directory under `root` that will receive the last component of `rel`
fn parent_in(root: &Path, rel: &str) -> PathBuf {
    match Path::new(rel).parent() {
        Some(parent) => root.join(parent),
        None => root.to_path_buf(),
    }
}

fn clean_backup(layout: &Layout) -> Result<String> {
    let backup = layout.backup();
    if !backup.exists() {
        return Ok(format!("{} not present, nothing to clean", layout.backup_name));
    }

    let mut summary = String::new();
    if let Some(dir) = &layout.archive_dir {
        let file = archive::default_archive_path(dir, &layout.backup_name);
        let size = archive::write_archive(&backup, &file, None)?;
        info!(path = %file.display(), size, "archived stale backup");
        summary.push_str(&format!("archived to {}, ", file.display()));
    }

    fsops::remove_path(&backup)?;
    summary.push_str(&format!("deleted {}", backup.display()));
    Ok(summary)
}

fn merge_build_gradle(layout: &Layout) -> Result<String> {
    let old_path = Layout::build_gradle(&layout.backup());
    let new_path = Layout::build_gradle(&layout.library());
    let old = fsops::read_text(&old_path)?;
    let new = fsops::read_text(&new_path)?;

    let head = gradle::head_through_android(&old).map_err(|e| block_error(e, &old_path))?;
    let tail = gradle::tail_after_android(&new).map_err(|e| block_error(e, &new_path))?;

    fsops::write_text(&new_path, &format!("{head}{tail}"))?;
    Ok(format!(
        "{} bytes from {}, {} bytes from {}",
        head.len(),
        layout.backup_name,
        tail.len(),
        layout.library_name
    ))
}

pub(crate) fn block_error(err: BlockError, path: &Path) -> DeployError {
    match err {
        BlockError::Missing => DeployError::MissingAndroidBlock(path.to_path_buf()),
        BlockError::Unbalanced => DeployError::UnbalancedAndroidBlock(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[derive(Deserialize)]
    struct Steps {
        steps: Vec<Step>,
    }

    #[test]
    fn test_deserialize_steps() {
        let parsed: Steps = toml::from_str(
            r#"
steps = [
    { kind = "clean-backup" },
    { kind = "organize-libs", delete = ["x.aar"] },
    { kind = "prune-libs" },
    { kind = "carry-dir", path = "src/main/java/com/draw" },
]
"#,
        )
        .unwrap();

        assert_eq!(parsed.steps[0], Step::CleanBackup);
        match &parsed.steps[1] {
            Step::OrganizeLibs(rules) => {
                assert_eq!(rules.delete, vec!["x.aar"]);
                assert_eq!(rules.keep, libs::default_keep());
                assert_eq!(rules.move_extensions, vec!["jar", "aar"]);
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(
            parsed.steps[2],
            Step::PruneLibs {
                keep: vec!["unity-classes.jar".to_string()]
            }
        );
        assert_eq!(parsed.steps[3].path(), Some("src/main/java/com/draw"));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let parsed: std::result::Result<Steps, _> =
            toml::from_str(r#"steps = [{ kind = "format-disk" }]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_paths() {
        let ok = Step::CarryDir {
            path: "src/main/res/layout".into(),
        };
        assert!(ok.validate().is_ok());

        for bad in ["", "/etc", "../outside", "src/../../x", ".", "./.", "./"] {
            let step = Step::CarryFile { path: bad.into() };
            assert!(
                matches!(step.validate(), Err(DeployError::InvalidStepPath(_))),
                "{bad} should be rejected"
            );
        }
        assert!(Step::Backup.validate().is_ok());
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        let step = Step::ReplaceDirContents { path: "a".into() };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["kind"], step.kind());
    }

    #[test]
    fn test_clean_backup_archives_then_deletes() {
        let tmp = tempdir().unwrap();
        let mut layout = Layout::new(tmp.path(), tmp.path().join("export/unityLibrary"));
        layout.archive_dir = Some(tmp.path().join("archives"));
        touch(&layout.backup().join("build.gradle"), "old");

        let summary = Step::CleanBackup.run(&layout).unwrap();

        assert!(!layout.backup().exists());
        assert!(summary.contains("archived to"));
        let archives: Vec<_> = fs::read_dir(tmp.path().join("archives"))
            .unwrap()
            .flatten()
            .collect();
        assert_eq!(archives.len(), 1);
    }

    #[test]
    fn test_clean_backup_absent_is_ok() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        assert!(Step::CleanBackup.run(&layout).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_backup_archives_symlinks_before_deleting() {
        use flate2::read::GzDecoder;
        use tar::{Archive, EntryType};

        let tmp = tempdir().unwrap();
        let mut layout = Layout::new(tmp.path(), tmp.path().join("export/unityLibrary"));
        layout.archive_dir = Some(tmp.path().join("archives"));
        touch(&layout.backup().join("build.gradle"), "old");
        fs::create_dir_all(layout.backup().join("libs")).unwrap();
        std::os::unix::fs::symlink(
            "../../shared/linked.aar",
            layout.backup().join("libs/linked.aar"),
        )
        .unwrap();

        Step::CleanBackup.run(&layout).unwrap();
        assert!(!layout.backup().exists());

        let file = fs::read_dir(tmp.path().join("archives"))
            .unwrap()
            .flatten()
            .next()
            .unwrap()
            .path();
        let mut archive = Archive::new(GzDecoder::new(fs::File::open(file).unwrap()));
        let link = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap())
            .find(|e| e.path().unwrap() == Path::new("unityLibrary2/libs/linked.aar"))
            .expect("symlink archived");
        assert_eq!(link.header().entry_type(), EntryType::Symlink);
        assert_eq!(
            link.link_name().unwrap().unwrap(),
            Path::new("../../shared/linked.aar")
        );
    }

    #[test]
    fn test_copy_library_replaces_stale_library() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("export/unityLibrary"));
        touch(&layout.new_library.join("build.gradle"), "new");
        touch(&layout.library().join("stale.txt"), "left over");
        touch(&layout.library().join("build.gradle"), "old");

        Step::CopyLibrary.run(&layout).unwrap();

        assert!(!layout.library().join("stale.txt").exists());
        assert_eq!(
            fs::read_to_string(layout.library().join("build.gradle")).unwrap(),
            "new"
        );
        assert!(!layout.library().join("unityLibrary").exists());
    }

    #[test]
    fn test_dot_paths_never_run() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        touch(&layout.backup().join("build.gradle"), "old");
        touch(&layout.library().join("build.gradle"), "new");

        let step = Step::CarryDir { path: ".".into() };
        assert!(matches!(
            step.validate(),
            Err(DeployError::InvalidStepPath(_))
        ));
        let step = Step::ReplaceDirContents { path: "./.".into() };
        assert!(step.validate().is_err());
    }

    #[test]
    fn test_describe_shows_resolved_paths() {
        let layout = Layout::new("/work/app", "/export/unityLibrary");
        let step = Step::CarryFile {
            path: "src/main/res/values/strings.xml".into(),
        };
        assert_eq!(
            step.describe(&layout),
            "Copy file /work/app/unityLibrary2/src/main/res/values/strings.xml \
             to /work/app/unityLibrary/src/main/res/values/strings.xml"
        );
        assert_eq!(
            Step::ReplaceBuildGradle.describe(&layout),
            "Replace /work/app/unityLibrary/build.gradle with /work/app/unityLibrary2/build.gradle"
        );
    }

    #[test]
    fn test_merge_manifest_activity_counts_replacements() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        touch(
            &Layout::manifest(&layout.backup()),
            "<activity android:name=\"Custom\">a</activity>",
        );
        let new_path = Layout::manifest(&layout.library());
        touch(&new_path, "<application/>");

        let summary = Step::MergeManifestActivity.run(&layout).unwrap();
        assert!(summary.contains("nothing replaced"));
        assert_eq!(fs::read_to_string(&new_path).unwrap(), "<application/>");

        touch(&new_path, "<activity>1</activity><activity>2</activity>");
        let summary = Step::MergeManifestActivity.run(&layout).unwrap();
        assert_eq!(summary, "2 activity element(s) replaced");
    }

    #[test]
    fn test_backup_requires_library() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        assert!(matches!(
            Step::Backup.run(&layout),
            Err(DeployError::NotFound(_))
        ));
    }

    #[test]
    fn test_organize_requires_app_libs_dir() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        fs::create_dir_all(layout.libs_dir()).unwrap();
        assert!(matches!(
            Step::OrganizeLibs(LibsRules::default()).run(&layout),
            Err(DeployError::AppLibsDirNotSet)
        ));
    }

    #[test]
    fn test_replace_manifest() {
        let tmp = tempdir().unwrap();
        let mut layout = Layout::new(tmp.path(), tmp.path().join("x"));
        let template = tmp.path().join("configs/online/AndroidManifest.xml");
        touch(&template, "<manifest online/>");
        touch(&Layout::manifest(&layout.library()), "<manifest exported/>");

        assert!(matches!(
            Step::ReplaceManifest.run(&layout),
            Err(DeployError::NoManifestTemplate)
        ));

        layout.manifest_template = Some(template);
        Step::ReplaceManifest.run(&layout).unwrap();
        assert_eq!(
            fs::read_to_string(Layout::manifest(&layout.library())).unwrap(),
            "<manifest online/>"
        );
    }

    #[test]
    fn test_merge_manifest_activity_requires_old_activity() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        touch(&Layout::manifest(&layout.backup()), "<manifest/>");
        touch(
            &Layout::manifest(&layout.library()),
            "<activity>x</activity>",
        );

        assert!(matches!(
            Step::MergeManifestActivity.run(&layout),
            Err(DeployError::MissingActivity(_))
        ));
    }

    #[test]
    fn test_merge_build_gradle_reports_old_file() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        touch(&Layout::build_gradle(&layout.backup()), "android {\n");
        touch(&Layout::build_gradle(&layout.library()), "android { }");

        match Step::MergeBuildGradle.run(&layout) {
            Err(DeployError::UnbalancedAndroidBlock(path)) => {
                assert_eq!(path, Layout::build_gradle(&layout.backup()))
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_replace_dir_contents() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        let rel = "src/main/java/com";
        touch(&layout.library().join(rel).join("unity3d/player/UnityPlayerActivity.java"), "gen");
        touch(&layout.backup().join(rel).join("unity3d/player/CustomActivity.java"), "mine");
        touch(&layout.backup().join(rel).join("draw/sdk/Pen.java"), "pen");

        let summary = Step::ReplaceDirContents { path: rel.into() }
            .run(&layout)
            .unwrap();

        let com = layout.library().join(rel);
        assert_eq!(summary, "removed 1, copied 2");
        assert!(!com.join("unity3d/player/UnityPlayerActivity.java").exists());
        assert!(com.join("unity3d/player/CustomActivity.java").exists());
        assert!(com.join("draw/sdk/Pen.java").exists());
    }

    #[test]
    fn test_carry_file_at_library_root() {
        let tmp = tempdir().unwrap();
        let layout = Layout::new(tmp.path(), tmp.path().join("x"));
        touch(&layout.backup().join("proguard-unity.txt"), "-keep");
        fs::create_dir_all(layout.library()).unwrap();

        Step::CarryFile {
            path: "proguard-unity.txt".into(),
        }
        .run(&layout)
        .unwrap();

        assert_eq!(
            fs::read_to_string(layout.library().join("proguard-unity.txt")).unwrap(),
            "-keep"
        );
    }
}
