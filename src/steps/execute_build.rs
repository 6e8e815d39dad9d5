//! Build-system generation and execution steps.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::cmake::builder::{cmake_project_dir, CMakeBuildSystemGenerator};
use crate::cmake::artifacts::CMAKE_BUILD_SUBDIR;
use crate::cmake::runner::CMakeRunner;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::step::{PipelineStep, StepSetup};
use crate::steps::parse_step_config;

pub fn generate_build_system_files(setup: StepSetup<'_>) -> Result<Box<dyn PipelineStep>> {
    Ok(Box::new(GenerateBuildSystemFiles {
        name: setup.config.step.clone(),
        output_dir: cmake_project_dir(setup.context),
    }))
}

/// Writes `CMakeLists.txt`, `variant.cmake` and the targets data.
pub struct GenerateBuildSystemFiles {
    name: String,
    output_dir: PathBuf,
}

impl PipelineStep for GenerateBuildSystemFiles {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn inputs(&self, ctx: &ExecutionContext) -> Vec<PathBuf> {
        let mut inputs = ctx.user_config_files.clone();
        inputs.extend(ctx.config_file.clone());
        inputs.extend(ctx.context_files().iter().cloned());
        inputs
    }

    fn outputs(&self, ctx: &ExecutionContext) -> Vec<PathBuf> {
        CMakeBuildSystemGenerator::new(ctx, &self.output_dir).output_files()
    }

    fn run(&mut self, ctx: &ExecutionContext) -> Result<()> {
        tracing::info!("Generating build system files in {}", self.output_dir.display());
        CMakeBuildSystemGenerator::new(ctx, &self.output_dir).write()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ExecuteBuildConfig {
    build_type: Option<String>,
}

pub fn execute_build(setup: StepSetup<'_>) -> Result<Box<dyn PipelineStep>> {
    let config: ExecuteBuildConfig = parse_step_config(setup.config)?;
    Ok(Box::new(ExecuteBuild {
        name: setup.config.step.clone(),
        output_dir: cmake_project_dir(setup.context),
        build_type: config.build_type,
    }))
}

/// Configures and builds the requested target. Ninja tracks what is out of
/// date, so the step runs on every invocation.
pub struct ExecuteBuild {
    name: String,
    output_dir: PathBuf,
    build_type: Option<String>,
}

impl PipelineStep for ExecuteBuild {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn inputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
        Vec::new()
    }

    fn outputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
        Vec::new()
    }

    fn always_run(&self) -> bool {
        true
    }

    fn run(&mut self, ctx: &ExecutionContext) -> Result<()> {
        let toolchain = match ctx.platform {
            Some(ref platform) => CMakeBuildSystemGenerator::new(ctx, &self.output_dir)
                .locate_toolchain_file(platform)?,
            None => None,
        };
        CMakeRunner::new(&self.output_dir, self.output_dir.join(CMAKE_BUILD_SUBDIR)).run(
            ctx,
            toolchain.as_deref(),
            self.build_type.as_deref(),
            &ctx.user_request.target_name(),
        )
    }
}
