//! Locations of project artifacts.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::util::diagnostic::UserNotification;
use crate::util::fs::absolutize;

/// Provides paths to project artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectArtifactsLocator {
    pub project_root_dir: PathBuf,
    pub build_dir: PathBuf,
    /// `build/<variant>[/<platform>]`
    pub variant_build_dir: PathBuf,
    pub external_dependencies_dir: PathBuf,
}

impl ProjectArtifactsLocator {
    pub fn new(
        project_root_dir: &Path,
        variant_name: Option<&str>,
        platform_name: Option<&str>,
    ) -> Self {
        let build_dir = project_root_dir.join("build");
        let mut variant_build_dir = build_dir.join(variant_name.unwrap_or("default"));
        if let Some(platform) = platform_name {
            variant_build_dir.push(platform);
        }
        ProjectArtifactsLocator {
            project_root_dir: project_root_dir.to_path_buf(),
            external_dependencies_dir: build_dir.join("external"),
            variant_build_dir,
            build_dir,
        }
    }

    /// Find a file referenced from configuration.
    ///
    /// Absolute paths must exist as given. Relative paths are tried against
    /// each search location (a file location means its directory) and then
    /// against the project root.
    pub fn locate_artifact(&self, artifact: &str, search: &[Option<PathBuf>]) -> Result<PathBuf> {
        let artifact_path = Path::new(artifact);
        if artifact_path.is_absolute() {
            if artifact_path.exists() {
                return Ok(artifact_path.to_path_buf());
            }
        } else {
            let bases = search
                .iter()
                .flatten()
                .map(|p| {
                    if p.is_file() {
                        p.parent().unwrap_or(p).to_path_buf()
                    } else {
                        p.clone()
                    }
                })
                .chain(std::iter::once(self.project_root_dir.clone()));
            for base in bases {
                let candidate = absolutize(&base, artifact_path);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }
        bail!(UserNotification::new(format!(
            "Artifact '{}' not found in any of the provided paths nor in the project root '{}'.",
            artifact,
            self.project_root_dir.display()
        )))
    }
}
