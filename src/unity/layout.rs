//! Resolved paths of one deployment

use std::path::{Path, PathBuf};

pub const DEFAULT_LIBRARY_NAME: &str = "unityLibrary";
pub const DEFAULT_BACKUP_NAME: &str = "unityLibrary2";

const BUILD_GRADLE: &str = "build.gradle";
const MANIFEST: &str = "src/main/AndroidManifest.xml";

/// Absolute locations every merge step works against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Parent directory holding the library and its backup
    pub project_dir: PathBuf,
    /// Freshly exported library to deploy
    pub new_library: PathBuf,
    pub library_name: String,
    pub backup_name: String,
    pub app_libs_dir: Option<PathBuf>,
    pub manifest_template: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
}

impl Layout {
    /// Layout with default names and no optional directories
    pub fn new(project_dir: impl Into<PathBuf>, new_library: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            new_library: new_library.into(),
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            backup_name: DEFAULT_BACKUP_NAME.to_string(),
            app_libs_dir: None,
            manifest_template: None,
            archive_dir: None,
        }
    }

    /// The deployed library (`unityLibrary`)
    pub fn library(&self) -> PathBuf {
        self.project_dir.join(&self.library_name)
    }

    /// The previous library set aside (`unityLibrary2`)
    pub fn backup(&self) -> PathBuf {
        self.project_dir.join(&self.backup_name)
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.library().join("libs")
    }

    pub fn build_gradle(root: &Path) -> PathBuf {
        root.join(BUILD_GRADLE)
    }

    pub fn manifest(root: &Path) -> PathBuf {
        root.join(MANIFEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let layout = Layout::new("/work/yzandroid", "/export/unityLibrary");
        assert_eq!(layout.library(), PathBuf::from("/work/yzandroid/unityLibrary"));
        assert_eq!(layout.backup(), PathBuf::from("/work/yzandroid/unityLibrary2"));
        assert_eq!(
            layout.libs_dir(),
            PathBuf::from("/work/yzandroid/unityLibrary/libs")
        );
        assert_eq!(
            Layout::manifest(&layout.backup()),
            PathBuf::from("/work/yzandroid/unityLibrary2/src/main/AndroidManifest.xml")
        );
    }
}
