//! Locations of generated CMake artifacts.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::cmake::backend::CMakePath;
use crate::core::artifacts::ProjectArtifactsLocator;

/// CMake binary directory, relative to the generated project directory.
pub const CMAKE_BUILD_SUBDIR: &str = "build";

/// Well-known files produced by the generated build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildArtifact {
    ReportConfig,
    TargetsData,
    CompileCommands,
    CoverageJson,
    CoverageDoc,
    CoverageHtml,
}

impl BuildArtifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            BuildArtifact::ReportConfig => "report_config.json",
            BuildArtifact::TargetsData => "targets_data.json",
            BuildArtifact::CompileCommands => "compile_commands.json",
            BuildArtifact::CoverageJson => "coverage.json",
            BuildArtifact::CoverageDoc => "coverage.md",
            BuildArtifact::CoverageHtml => "coverage/index.html",
        }
    }
}

/// Paths inside the CMake build tree, expressed through `CMAKE_BUILD_DIR`.
#[derive(Debug, Clone)]
pub struct CMakeArtifactsLocator {
    pub project: ProjectArtifactsLocator,
    pub cmake_project_dir: PathBuf,
    pub cmake_build_dir: CMakePath,
}

impl CMakeArtifactsLocator {
    /// `output_dir` holds the generated `CMakeLists.txt`.
    pub fn new(output_dir: &Path, project: ProjectArtifactsLocator) -> Self {
        CMakeArtifactsLocator {
            project,
            cmake_project_dir: output_dir.to_path_buf(),
            cmake_build_dir: CMakePath::with_variable(
                output_dir.join(CMAKE_BUILD_SUBDIR),
                "CMAKE_BUILD_DIR",
            ),
        }
    }

    pub fn project_root_dir(&self) -> &Path {
        &self.project.project_root_dir
    }

    pub fn reports_dir(&self) -> CMakePath {
        self.cmake_build_dir.join("reports")
    }

    pub fn component_build_dir(&self, component_name: &str) -> CMakePath {
        self.cmake_build_dir.join(component_name)
    }

    pub fn component_reports_dir(&self, component_name: &str) -> CMakePath {
        self.reports_dir().join(component_name)
    }

    pub fn build_artifact(&self, artifact: BuildArtifact) -> CMakePath {
        self.cmake_build_dir.join(artifact.file_name())
    }

    pub fn component_build_artifact(
        &self,
        component_name: &str,
        artifact: BuildArtifact,
    ) -> CMakePath {
        self.component_build_dir(component_name).join(artifact.file_name())
    }

    pub fn component_reports_artifact(
        &self,
        component_name: &str,
        artifact: BuildArtifact,
    ) -> CMakePath {
        self.component_reports_dir(component_name).join(artifact.file_name())
    }

    /// GoogleTest sources: `gtest` in the build dir, the external
    /// dependencies dir or the project root.
    pub fn gtest_dir(&self) -> Result<PathBuf> {
        self.project.locate_artifact(
            "gtest",
            &[
                Some(self.project.build_dir.clone()),
                Some(self.project.external_dependencies_dir.clone()),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_use_build_dir_variable() {
        let project = ProjectArtifactsLocator::new(Path::new("/p"), Some("Blue"), None);
        let locator = CMakeArtifactsLocator::new(&project.variant_build_dir.clone(), project);

        assert_eq!(
            locator.component_build_artifact("CompA", BuildArtifact::CoverageJson).to_string(),
            "${CMAKE_BUILD_DIR}/CompA/coverage.json"
        );
        assert_eq!(
            locator.build_artifact(BuildArtifact::TargetsData).to_path(),
            PathBuf::from("/p/build/Blue/build/targets_data.json")
        );
        assert_eq!(
            locator.component_reports_dir("CompA").to_string(),
            "${CMAKE_BUILD_DIR}/reports/CompA"
        );
    }

    #[test]
    fn test_missing_gtest_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let project = ProjectArtifactsLocator::new(tmp.path(), None, None);
        let locator = CMakeArtifactsLocator::new(&project.variant_build_dir.clone(), project);
        assert!(locator.gtest_dir().is_err());

        std::fs::create_dir_all(tmp.path().join("build/external/gtest")).unwrap();
        assert_eq!(locator.gtest_dir().unwrap(), tmp.path().join("build/external/gtest"));
    }
}
