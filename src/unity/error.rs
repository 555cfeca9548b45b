//! Error type shared by the merge steps

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Everything that can stop a deployment
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    /// An I/O call failed; `action` is a verb phrase like "read" or "remove"
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: fs_extra::error::Error,
    },

    #[error("No `android {{ ... }}` block found in {}", .0.display())]
    MissingAndroidBlock(PathBuf),

    #[error("Unbalanced braces in the `android` block of {}", .0.display())]
    UnbalancedAndroidBlock(PathBuf),

    #[error("No <activity> element found in {}", .0.display())]
    MissingActivity(PathBuf),

    #[error("`app_libs_dir` is not configured for this profile")]
    AppLibsDirNotSet,

    #[error("No manifest template selected (set `manifest_template` or pass --manifest)")]
    NoManifestTemplate,

    #[error("Unknown manifest template '{0}'")]
    UnknownManifestTemplate(String),

    #[error("Invalid step path '{0}': must be relative and must not contain '..'")]
    InvalidStepPath(String),

    #[error("History database error: {0}")]
    History(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Wrap an `io::Error` with the path it happened on
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
