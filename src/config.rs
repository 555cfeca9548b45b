//! Profile configuration and platform-specific paths

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::unity::layout::{DEFAULT_BACKUP_NAME, DEFAULT_LIBRARY_NAME};
use crate::unity::{self, DeployError, Layout, Step};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "UNITY_DEPLOY_CONFIG";

const APP_DIR: &str = "unity-deploy";

/// Config file location: `explicit`, then `$UNITY_DEPLOY_CONFIG`, then
/// - macOS: ~/Library/Application Support/unity-deploy/config.toml
/// - Linux: ~/.config/unity-deploy/config.toml
/// - Windows: %APPDATA%/unity-deploy/config.toml
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    let config = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config.join(APP_DIR).join("config.toml"))
}

/// Deployment journal location
/// - macOS: ~/Library/Application Support/unity-deploy/history.db
/// - Linux: ~/.local/share/unity-deploy/history.db
/// - Windows: %APPDATA%/unity-deploy/history.db
pub fn history_db_path() -> Result<PathBuf> {
    let data = dirs::data_dir().context("Could not determine data directory")?;
    Ok(data.join(APP_DIR).join("history.db"))
}

fn default_library_name() -> String {
    DEFAULT_LIBRARY_NAME.to_string()
}

fn default_backup_name() -> String {
    DEFAULT_BACKUP_NAME.to_string()
}

/// One target project and the steps that deploy into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Parent directory holding the library and its backup
    pub project_dir: PathBuf,

    /// Freshly exported library
    pub new_library: PathBuf,

    #[serde(default = "default_library_name")]
    pub library_name: String,

    #[serde(default = "default_backup_name")]
    pub backup_name: String,

    /// Where `organize-libs` moves jars and aars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_libs_dir: Option<PathBuf>,

    /// Named manifests `replace-manifest` can swap in
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manifest_templates: BTreeMap<String, PathBuf>,

    /// Selected entry of `manifest_templates`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_template: Option<String>,

    /// Where `clean-backup` archives the stale backup before deleting it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<PathBuf>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Profile {
    /// Resolve paths for a run. `manifest` overrides the configured template name.
    ///
    /// With no name given anywhere, a single configured template is used.
    pub fn layout(&self, manifest: Option<&str>) -> unity::Result<Layout> {
        let template = match manifest.or(self.manifest_template.as_deref()) {
            Some(name) => Some(
                self.manifest_templates
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DeployError::UnknownManifestTemplate(name.to_string()))?,
            ),
            None if self.manifest_templates.len() == 1 => {
                self.manifest_templates.values().next().cloned()
            }
            None => None,
        };

        Ok(Layout {
            project_dir: self.project_dir.clone(),
            new_library: self.new_library.clone(),
            library_name: self.library_name.clone(),
            backup_name: self.backup_name.clone(),
            app_libs_dir: self.app_libs_dir.clone(),
            manifest_template: template,
            archive_dir: self.archive_dir.clone(),
        })
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.project_dir = expand(&self.project_dir)?;
        self.new_library = expand(&self.new_library)?;
        for path in [&mut self.app_libs_dir, &mut self.archive_dir]
            .into_iter()
            .flatten()
        {
            *path = expand(path.as_path())?;
        }
        for path in self.manifest_templates.values_mut() {
            *path = expand(path.as_path())?;
        }
        Ok(())
    }
}

/// Expand `~` and `$VAR` in a configured path
fn expand(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path '{}'", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// The whole config file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    /// Parse TOML, expand paths and reject invalid steps
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        for (name, profile) in &mut config.profiles {
            profile
                .expand_paths()
                .with_context(|| format!("Profile '{}'", name))?;
            for step in &profile.steps {
                step.validate()
                    .with_context(|| format!("Profile '{}', step '{}'", name, step.kind()))?;
            }
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Config file not found: {} (run `unity-deploy init` to create one)",
                path.display()
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile),
            None => {
                let known: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
                bail!(
                    "Unknown profile '{}' (available: {})",
                    name,
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            }
        }
    }
}

/// Written by `init`: the three deployment flavours
pub const SAMPLE_CONFIG: &str = r#"# unity-deploy profiles
#
# Each profile merges a freshly exported Unity library (new_library) into
# <project_dir>/<library_name>, keeping the previous library as
# <project_dir>/<backup_name> and carrying customizations back from it.

# Phone app: libs move into the app module, manifest comes from a template
[profiles.app]
project_dir = "~/work/yzandroid"
new_library = "~/unity/export/app/unityLibrary"
app_libs_dir = "~/work/yzandroid/app/libs"
archive_dir = "~/work/archives"
manifest_template = "online"
manifest_templates = { online = "~/work/configs/online/AndroidManifest.xml", offline = "~/work/configs/offline/AndroidManifest.xml" }
steps = [
    { kind = "clean-backup" },
    { kind = "backup" },
    { kind = "copy-library" },
    { kind = "organize-libs" },
    { kind = "replace-build-gradle" },
    { kind = "replace-manifest" },
    { kind = "replace-dir-contents", path = "src/main/java/com" },
]

# Launcher: keeps its own activity, drawing SDK and layouts
[profiles.launcher]
project_dir = "~/work/launcher"
new_library = "~/unity/export/launcher/unityLibrary"
steps = [
    { kind = "backup" },
    { kind = "copy-library" },
    { kind = "merge-manifest-activity" },
    { kind = "carry-dir", path = "src/main/java/com/draw" },
    { kind = "carry-dir", path = "src/main/java/com/unity3d/player" },
    { kind = "carry-dir", path = "src/main/res/layout" },
    { kind = "carry-file", path = "src/main/res/values/strings.xml" },
    { kind = "prune-libs" },
    { kind = "merge-build-gradle" },
]

# Kiosk: the host app supplies the activity
[profiles.kiosk]
project_dir = "~/work/kiosk"
new_library = "~/unity/export/kiosk/unityLibrary"
steps = [
    { kind = "backup" },
    { kind = "copy-library" },
    { kind = "prune-libs" },
    { kind = "merge-build-gradle" },
    { kind = "comment-manifest-activity" },
    { kind = "replace-dir-contents", path = "src/main/java/com" },
]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unity::libs::LibsRules;

    #[test]
    fn test_paths_exist() {
        // These should not panic
        let _ = history_db_path();
        let explicit = config_path(Some(Path::new("/tmp/c.toml"))).unwrap();
        assert_eq!(explicit, PathBuf::from("/tmp/c.toml"));
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::parse(SAMPLE_CONFIG).unwrap();
        let names: Vec<_> = config.profiles.keys().cloned().collect();
        assert_eq!(names, vec!["app", "kiosk", "launcher"]);

        let app = config.profile("app").unwrap();
        assert_eq!(app.steps.len(), 7);
        assert_eq!(app.steps[3], Step::OrganizeLibs(LibsRules::default()));
        assert_eq!(app.library_name, "unityLibrary");
        assert_eq!(app.backup_name, "unityLibrary2");
        assert!(!app.project_dir.starts_with("~"));

        assert_eq!(config.profile("launcher").unwrap().steps.len(), 9);
        assert_eq!(config.profile("kiosk").unwrap().steps.len(), 6);
    }

    #[test]
    fn test_unknown_profile_lists_available() {
        let config = Config::parse(SAMPLE_CONFIG).unwrap();
        let err = config.profile("tv").unwrap_err().to_string();
        assert!(err.contains("Unknown profile 'tv'"));
        assert!(err.contains("app, kiosk, launcher"));
    }

    #[test]
    fn test_missing_required_field() {
        let err = Config::parse("[profiles.x]\nproject_dir = \"/p\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("new_library"));
    }

    #[test]
    fn test_invalid_step_path_is_a_config_error() {
        let toml = r#"
[profiles.x]
project_dir = "/p"
new_library = "/n"
steps = [{ kind = "carry-file", path = "../secrets" }]
"#;
        let err = Config::parse(toml).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid step path"));
    }

    #[test]
    fn test_env_vars_expand() {
        std::env::set_var("UNITY_DEPLOY_TEST_ROOT", "/srv/build");
        let toml = r#"
[profiles.x]
project_dir = "$UNITY_DEPLOY_TEST_ROOT/android"
new_library = "${UNITY_DEPLOY_TEST_ROOT}/export/unityLibrary"
"#;
        let config = Config::parse(toml).unwrap();
        let x = config.profile("x").unwrap();
        assert_eq!(x.project_dir, PathBuf::from("/srv/build/android"));
        assert_eq!(
            x.new_library,
            PathBuf::from("/srv/build/export/unityLibrary")
        );
        assert!(x.steps.is_empty());
    }

    fn templated(selected: Option<&str>, names: &[&str]) -> Profile {
        Profile {
            project_dir: PathBuf::from("/p"),
            new_library: PathBuf::from("/n"),
            library_name: default_library_name(),
            backup_name: default_backup_name(),
            app_libs_dir: None,
            manifest_templates: names
                .iter()
                .map(|n| (n.to_string(), PathBuf::from(format!("/t/{n}.xml"))))
                .collect(),
            manifest_template: selected.map(str::to_string),
            archive_dir: None,
            steps: Vec::new(),
        }
    }

    #[test]
    fn test_manifest_template_selection() {
        let profile = templated(Some("online"), &["online", "offline"]);
        assert_eq!(
            profile.layout(None).unwrap().manifest_template,
            Some(PathBuf::from("/t/online.xml"))
        );
        assert_eq!(
            profile.layout(Some("offline")).unwrap().manifest_template,
            Some(PathBuf::from("/t/offline.xml"))
        );
        assert!(matches!(
            profile.layout(Some("beta")),
            Err(DeployError::UnknownManifestTemplate(_))
        ));
    }

    #[test]
    fn test_single_template_is_implicit() {
        let profile = templated(None, &["only"]);
        assert_eq!(
            profile.layout(None).unwrap().manifest_template,
            Some(PathBuf::from("/t/only.xml"))
        );

        let ambiguous = templated(None, &["a", "b"]);
        assert_eq!(ambiguous.layout(None).unwrap().manifest_template, None);
    }
}
