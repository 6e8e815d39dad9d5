//! Invokes cmake on the generated project.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use regex::Regex;
use semver::Version;

use crate::pipeline::context::ExecutionContext;
use crate::util::diagnostic::{suggestions, UserNotification};
use crate::util::fs::{ensure_dir, to_posix};
use crate::util::process::{find_executable_in, with_captured_output};

/// Oldest cmake able to handle the generated files.
pub const MINIMUM_CMAKE_VERSION: Version = Version::new(3, 20, 0);

/// Extract the version from `cmake --version` output.
pub fn parse_cmake_version(output: &str) -> Option<Version> {
    let re = Regex::new(r"cmake version (\d+)\.(\d+)(?:\.(\d+))?").ok()?;
    let caps = re.captures(output)?;
    let part = |i: usize| caps.get(i).map_or(Ok(0), |m| m.as_str().parse::<u64>());
    Some(Version::new(part(1).ok()?, part(2).ok()?, part(3).ok()?))
}

/// Configures and builds a CMake project with Ninja.
pub struct CMakeRunner {
    pub project_dir: PathBuf,
    pub build_dir: PathBuf,
}

impl CMakeRunner {
    pub const EXECUTABLE: &'static str = "cmake";

    pub fn new(project_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        CMakeRunner {
            project_dir: project_dir.into(),
            build_dir: build_dir.into(),
        }
    }

    pub fn configure_args(
        &self,
        toolchain_file: Option<&Path>,
        variant_name: Option<&str>,
        platform_name: Option<&str>,
        build_type: Option<&str>,
    ) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            to_posix(&self.project_dir),
            "-B".to_string(),
            to_posix(&self.build_dir),
            "-G".to_string(),
            "Ninja".to_string(),
        ];
        if let Some(toolchain) = toolchain_file {
            args.push(format!("-DCMAKE_TOOLCHAIN_FILE={}", to_posix(toolchain)));
        }
        if let Some(variant) = variant_name {
            args.push(format!("-DVARIANT={}", variant));
        }
        if let Some(platform) = platform_name {
            args.push(format!("-DPLATFORM={}", platform));
        }
        if let Some(build_type) = build_type {
            args.push(format!("-DCMAKE_BUILD_TYPE={}", build_type));
        }
        args
    }

    pub fn build_args(&self, target: &str) -> Vec<String> {
        vec![
            "--build".to_string(),
            to_posix(&self.build_dir),
            "--target".to_string(),
            target.to_string(),
            "--".to_string(),
        ]
    }

    /// Locate cmake (install dirs first) and require a supported version.
    pub fn check_cmake(ctx: &ExecutionContext) -> Result<PathBuf> {
        let Some(cmake) = find_executable_in(Self::EXECUTABLE, ctx.install_dirs()) else {
            bail!(
                UserNotification::new("CMake not found. CMake is required to build the variant.")
                    .with_help(suggestions::CMAKE_NOT_FOUND)
            );
        };
        let output = ctx.create_process(&cmake).arg("--version").exec_and_check()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(version) = parse_cmake_version(&stdout) else {
            bail!(UserNotification::new(format!(
                "Could not determine the CMake version from '{}'.",
                stdout.trim()
            )));
        };
        if version < MINIMUM_CMAKE_VERSION {
            bail!(UserNotification::new(format!(
                "CMake {} is too old, at least {} is required.",
                version, MINIMUM_CMAKE_VERSION
            )));
        }
        tracing::debug!("using cmake {} from {}", version, cmake.display());
        Ok(cmake)
    }

    /// Configure and build `target`.
    pub fn run(
        &self,
        ctx: &ExecutionContext,
        toolchain_file: Option<&Path>,
        build_type: Option<&str>,
        target: &str,
    ) -> Result<()> {
        let cmake = Self::check_cmake(ctx)?;
        ensure_dir(&self.build_dir)?;

        let configure = self.configure_args(
            toolchain_file,
            ctx.variant_name.as_deref(),
            ctx.platform_name(),
            build_type,
        );
        tracing::info!("Configuring CMake project in {}", self.build_dir.display());
        run_checked(ctx, &cmake, configure)?;

        tracing::info!("Building target '{}'", target);
        run_checked(ctx, &cmake, self.build_args(target))
    }
}

fn run_checked(ctx: &ExecutionContext, cmake: &Path, args: Vec<String>) -> Result<()> {
    let process = ctx.create_process(cmake).args(args);
    let output = process.exec_streaming()?;
    if !output.status.success() {
        bail!(UserNotification::new(with_captured_output(
            format!(
                "Command '{}' failed with exit code {}.",
                process.display_command(),
                output.status.code().map_or_else(|| "unknown".to_string(), |c| c.to_string())
            ),
            &output
        ))
        .with_help(suggestions::BUILD_FAILED));
    }
    Ok(())
}
