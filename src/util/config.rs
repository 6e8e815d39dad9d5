//! Tool settings for yanga itself.
//!
//! Settings come from two optional files in the project root:
//! - `yanga.toml` - plain top-level keys
//! - `pyproject.toml` - the `[tool.yanga]` table
//!
//! Values from `pyproject.toml` take precedence over `yanga.toml`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::diagnostic::UserNotification;

/// Default name of the project configuration files.
pub const DEFAULT_CONFIGURATION_FILE_NAME: &str = "yanga.yaml";

/// Directories never scanned for configuration files.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", ".github", ".vscode", "build", ".venv"];

/// Yanga tool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YangaSettings {
    /// Custom name for the project configuration files
    pub configuration_file_name: Option<String>,

    /// Extra directories to exclude from configuration discovery
    pub exclude_dirs: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PyProject {
    tool: PyProjectTool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PyProjectTool {
    yanga: Option<YangaSettings>,
}

impl YangaSettings {
    /// Load settings for the project rooted at `project_dir`.
    ///
    /// Missing files are not an error; the defaults apply.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut settings = YangaSettings::default();

        let yanga_toml = project_dir.join("yanga.toml");
        if yanga_toml.is_file() {
            settings.merge(Self::load_file(&yanga_toml)?);
        }

        let pyproject = project_dir.join("pyproject.toml");
        if pyproject.is_file() {
            let contents = std::fs::read_to_string(&pyproject)
                .with_context(|| format!("failed to read {}", pyproject.display()))?;
            let parsed: PyProject = toml::from_str(&contents).map_err(|e| {
                UserNotification::new(format!(
                    "Failed parsing '{}'.\nError: {}",
                    pyproject.display(),
                    e
                ))
            })?;
            if let Some(tool_settings) = parsed.tool.yanga {
                settings.merge(tool_settings);
            }
        }

        Ok(settings)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = toml::from_str(&contents).map_err(|e| {
            UserNotification::new(format!("Failed parsing '{}'.\nError: {}", path.display(), e))
        })?;
        Ok(settings)
    }

    /// Merge another settings layer on top of this one.
    pub fn merge(&mut self, other: YangaSettings) {
        if other.configuration_file_name.is_some() {
            self.configuration_file_name = other.configuration_file_name;
        }
        if !other.exclude_dirs.is_empty() {
            self.exclude_dirs = other.exclude_dirs;
        }
    }

    /// Configuration file name, falling back to the default.
    pub fn configuration_file_name(&self) -> &str {
        self.configuration_file_name
            .as_deref()
            .unwrap_or(DEFAULT_CONFIGURATION_FILE_NAME)
    }

    /// Effective exclude list: the built-in directories plus configured ones.
    pub fn effective_exclude_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect();
        for dir in &self.exclude_dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }
}
