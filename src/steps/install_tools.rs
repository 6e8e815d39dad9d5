//! Tool installation step.
//!
//! Optionally runs an install command, then publishes install directories,
//! include directories and environment variables to the following steps. The published data is
//! persisted so a skipped run still contributes it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::context::{ExecutionContext, StaticIncludeDirectories};
use crate::pipeline::step::{PipelineStep, StepSetup};
use crate::steps::parse_step_config;
use crate::util::diagnostic::UserNotification;
use crate::util::fs::{absolutize, read_to_string, write_string};
use crate::util::process::with_captured_output;

pub const EXEC_INFO_FILE: &str = "install_tools_exec_info.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct InstallToolsConfig {
    /// Program followed by its arguments
    command: Vec<String>,
    /// Directories added to `PATH`, relative to the project root
    install_dirs: Vec<String>,
    /// Include directories of installed libraries, relative to the project root
    include_dirs: Vec<String>,
    env_vars: BTreeMap<String, String>,
}

/// What a run of the step published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallToolsExecInfo {
    pub install_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    pub env_vars: BTreeMap<String, String>,
}

impl InstallToolsExecInfo {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(self).context("failed to serialize install info")?;
        write_string(path, &contents)
    }
}

pub fn install_tools(setup: StepSetup<'_>) -> Result<Box<dyn PipelineStep>> {
    let config: InstallToolsConfig = parse_step_config(setup.config)?;
    let root = &setup.context.project_root_dir;
    let locate = |dirs: &[String]| -> Vec<PathBuf> {
        dirs.iter().map(|d| absolutize(root, Path::new(d))).collect()
    };
    Ok(Box::new(InstallTools {
        name: setup.config.step.clone(),
        command: config.command,
        info: InstallToolsExecInfo {
            install_dirs: locate(&config.install_dirs),
            include_dirs: locate(&config.include_dirs),
            env_vars: config.env_vars,
        },
        output_dir: setup.output_dir,
    }))
}

pub struct InstallTools {
    name: String,
    command: Vec<String>,
    info: InstallToolsExecInfo,
    output_dir: PathBuf,
}

impl InstallTools {
    fn exec_info_file(&self) -> PathBuf {
        self.output_dir.join(EXEC_INFO_FILE)
    }
}

impl PipelineStep for InstallTools {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn inputs(&self, ctx: &ExecutionContext) -> Vec<PathBuf> {
        ctx.user_config_files.clone()
    }

    fn outputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
        vec![self.exec_info_file()]
    }

    fn run(&mut self, ctx: &ExecutionContext) -> Result<()> {
        if let Some((program, args)) = self.command.split_first() {
            let process = ctx.create_process(program).args(args);
            tracing::info!("Running {}", process.display_command());
            let output = process.exec_streaming()?;
            if !output.status.success() {
                bail!(UserNotification::new(with_captured_output(
                    format!(
                        "Tool installation '{}' failed with exit code {:?}.",
                        process.display_command(),
                        output.status.code()
                    ),
                    &output
                )));
            }
        }
        self.info.to_json_file(&self.exec_info_file())
    }

    fn update_execution_context(&self, ctx: &mut ExecutionContext) -> Result<()> {
        let file = self.exec_info_file();
        if !file.exists() {
            return Ok(());
        }
        let info = InstallToolsExecInfo::from_json_file(&file)?;
        ctx.add_context_file(file);
        ctx.add_install_dirs(info.install_dirs);
        ctx.add_env_vars(info.env_vars);
        if !info.include_dirs.is_empty() {
            ctx.add_include_dirs_provider(Box::new(StaticIncludeDirectories(info.include_dirs)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StepConfig;
    use crate::pipeline::context::UserRequest;
    use crate::pipeline::fingerprint::{ExecutionOutcome, Executor};
    use tempfile::TempDir;

    fn step_config() -> StepConfig {
        let mut config = StepConfig::new("InstallTools");
        config.config = Some(
            serde_yaml::from_str(
                "install_dirs: [tools/bin]\ninclude_dirs: [tools/include]\nenv_vars:\n  CC: clang\n",
            )
            .unwrap(),
        );
        config
    }

    #[test]
    fn test_skipped_run_still_updates_context() {
        let tmp = TempDir::new().unwrap();
        let config = step_config();
        let output_dir = tmp.path().join("build/default/install");

        for expected in [true, false] {
            let mut ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));
            let mut step = install_tools(StepSetup {
                config: &config,
                group: Some("install"),
                output_dir: output_dir.clone(),
                context: &ctx,
            })
            .unwrap();
            let outcome = Executor::new(&output_dir).execute(step.as_mut(), &ctx).unwrap();
            assert_eq!(outcome.executed(), expected);
            if !expected {
                assert_eq!(outcome, ExecutionOutcome::Skipped);
            }

            step.update_execution_context(&mut ctx).unwrap();
            assert_eq!(ctx.install_dirs(), &[tmp.path().join("tools/bin")]);
            assert_eq!(ctx.env_vars().get("CC").map(String::as_str), Some("clang"));
            assert_eq!(ctx.include_directories(), vec![tmp.path().join("tools/include")]);
            assert_eq!(ctx.context_files(), &[output_dir.join("install_tools_exec_info.json")]);
        }
    }

    #[test]
    fn test_no_exec_info_leaves_context_untouched() {
        let tmp = TempDir::new().unwrap();
        let config = step_config();
        let mut ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));
        let step = install_tools(StepSetup {
            config: &config,
            group: None,
            output_dir: tmp.path().join("out"),
            context: &ctx,
        })
        .unwrap();

        step.update_execution_context(&mut ctx).unwrap();
        assert!(ctx.install_dirs().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_install_reports_output() {
        let tmp = TempDir::new().unwrap();
        let mut config = StepConfig::new("InstallTools");
        let yaml = "command: [sh, -c, 'echo no-network >&2; exit 1']\n";
        config.config = Some(serde_yaml::from_str(yaml).unwrap());
        let ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));
        let mut step = install_tools(StepSetup {
            config: &config,
            group: None,
            output_dir: tmp.path().join("out"),
            context: &ctx,
        })
        .unwrap();

        let err = step.run(&ctx).unwrap_err();
        let message = err.downcast_ref::<UserNotification>().unwrap().message().to_string();
        assert!(message.contains("no-network"));
        assert!(!tmp.path().join("out/install_tools_exec_info.json").exists());
    }

    #[test]
    fn test_invalid_config_is_user_notification() {
        let tmp = TempDir::new().unwrap();
        let mut config = StepConfig::new("InstallTools");
        config.config = Some(serde_yaml::from_str("install_dirs: 3\n").unwrap());
        let ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));

        let err = install_tools(StepSetup {
            config: &config,
            group: None,
            output_dir: tmp.path().to_path_buf(),
            context: &ctx,
        })
        .err()
        .unwrap();
        assert!(err.downcast_ref::<UserNotification>().is_some());
    }
}
