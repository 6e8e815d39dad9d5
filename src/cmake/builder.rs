//! Top-level CMake project composition.
//!
//! `CMakeLists.txt` declares the project and includes `variant.cmake`,
//! which holds whatever the platform's generators produce.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cmake::artifacts::{BuildArtifact, CMakeArtifactsLocator};
use crate::cmake::backend::{CMakeElement, CMakeFile, CMakePath, CMakeVariable};
use crate::cmake::generator::{GeneratorRegistry, GeneratorSetup};
use crate::cmake::targets_data::collect_targets;
use crate::core::config::PlatformConfig;
use crate::core::targets::TargetsData;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::loader::{StepLoader, StepSource};
use crate::util::diagnostic::UserNotification;
use crate::util::fs::to_posix;

pub const CMAKE_MINIMUM_VERSION: &str = "3.20";
pub const CMAKE_LISTS_FILE: &str = "CMakeLists.txt";
pub const VARIANT_CMAKE_FILE: &str = "variant.cmake";

pub struct CMakeBuildSystemGenerator<'a> {
    ctx: &'a ExecutionContext,
    output_dir: PathBuf,
    registry: GeneratorRegistry,
}

impl<'a> CMakeBuildSystemGenerator<'a> {
    pub fn new(ctx: &'a ExecutionContext, output_dir: impl Into<PathBuf>) -> Self {
        CMakeBuildSystemGenerator {
            ctx,
            output_dir: output_dir.into(),
            registry: GeneratorRegistry::new(),
        }
    }

    pub fn artifacts_locator(&self) -> CMakeArtifactsLocator {
        CMakeArtifactsLocator::new(&self.output_dir, self.ctx.create_artifacts_locator())
    }

    /// Every file written by [`Self::write`].
    pub fn output_files(&self) -> Vec<PathBuf> {
        vec![
            self.output_dir.join(CMAKE_LISTS_FILE),
            self.output_dir.join(VARIANT_CMAKE_FILE),
            self.targets_data_file(),
        ]
    }

    pub fn targets_data_file(&self) -> PathBuf {
        self.artifacts_locator()
            .build_artifact(BuildArtifact::TargetsData)
            .to_path()
    }

    pub fn generate(&self) -> Result<Vec<CMakeFile>> {
        let mut cmake_lists = self.create_cmake_lists()?;
        let variant_file = self.create_variant_cmake_file()?;
        let include = CMakePath::with_variable(&self.output_dir, "CMAKE_CURRENT_LIST_DIR")
            .join(VARIANT_CMAKE_FILE);
        cmake_lists.append(CMakeElement::Include(include.to_string()));
        Ok(vec![cmake_lists, variant_file])
    }

    /// Generate and write all files, including the targets data.
    pub fn write(&self) -> Result<()> {
        let files = self.generate()?;
        for file in &files {
            if file.to_file()? {
                tracing::info!("Generated {}", file.path.display());
            } else {
                tracing::debug!("{} is up to date", file.path.display());
            }
        }
        let targets = Self::targets_data(&files);
        targets.save(&self.targets_data_file())?;
        Ok(())
    }

    pub fn targets_data(files: &[CMakeFile]) -> TargetsData {
        collect_targets(files.iter().flat_map(|f| f.elements()))
    }

    fn create_cmake_lists(&self) -> Result<CMakeFile> {
        let mut file = CMakeFile::new(self.output_dir.join(CMAKE_LISTS_FILE));
        file.append(CMakeElement::MinimumVersion(CMAKE_MINIMUM_VERSION.to_string()));
        if let Some(ref platform) = self.ctx.platform {
            if let Some(toolchain) = self.locate_toolchain_file(platform)? {
                file.append(CMakeElement::Variable(CMakeVariable::new(
                    "CMAKE_TOOLCHAIN_FILE",
                    to_posix(&toolchain),
                )));
            }
        }
        file.append(CMakeElement::Project(
            self.ctx.variant_name.clone().unwrap_or_else(|| "MyProject".to_string()),
        ));
        file.append(CMakeElement::Variable(CMakeVariable::new(
            "CMAKE_EXPORT_COMPILE_COMMANDS",
            "ON",
        )));
        file.extend(self.artifacts_locator().cmake_build_dir.to_cmake_element());
        Ok(file)
    }

    pub fn locate_toolchain_file(&self, platform: &PlatformConfig) -> Result<Option<PathBuf>> {
        let Some(ref toolchain) = platform.toolchain_file else {
            return Ok(None);
        };
        let located = self
            .ctx
            .create_artifacts_locator()
            .locate_artifact(toolchain, &[platform.file.clone()]);
        match located {
            Ok(path) => Ok(Some(path)),
            Err(_) => {
                let mut note = UserNotification::new(format!(
                    "Toolchain file '{}' of platform '{}' not found.",
                    toolchain, platform.name
                ));
                if let Some(ref file) = platform.file {
                    note = note.with_location(file.clone());
                }
                bail!(note)
            }
        }
    }

    fn create_variant_cmake_file(&self) -> Result<CMakeFile> {
        let mut file = CMakeFile::new(self.output_dir.join(VARIANT_CMAKE_FILE));
        let Some(ref platform) = self.ctx.platform else {
            return Ok(file);
        };

        let origin = format!("platform '{}'", platform.name);
        let loader = StepLoader::new(&self.registry, &self.ctx.project_root_dir);
        for config in &platform.cmake_generators {
            let reference = loader
                .load_step(None, &origin, config)
                .map_err(|e| with_platform_file(UserNotification::from(e), platform))?;
            let factory = match reference.source {
                StepSource::Registered(factory) => factory,
                StepSource::File { ref path, .. } => bail!(with_platform_file(
                    UserNotification::new(format!(
                        "CMake generator '{}' of {} cannot be loaded from file '{}'. Only built-in generators are supported.",
                        config.step,
                        origin,
                        path.display()
                    )),
                    platform
                )),
            };
            let generator = factory(GeneratorSetup {
                config,
                output_dir: self.output_dir.clone(),
                context: self.ctx,
            })?;
            tracing::debug!("running CMake generator `{}`", config.step);
            file.extend(generator.generate()?);
        }
        Ok(file)
    }
}

fn with_platform_file(note: UserNotification, platform: &PlatformConfig) -> UserNotification {
    match platform.file {
        Some(ref file) => {
            note.with_help(format!("help: Check the cmake_generators of {}", file.display()))
        }
        None => note,
    }
}

/// `build/<variant>[/<platform>]`, where the CMake project lives.
pub fn cmake_project_dir(ctx: &ExecutionContext) -> PathBuf {
    ctx.create_artifacts_locator().variant_build_dir
}
