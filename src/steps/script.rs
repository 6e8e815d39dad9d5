//! Project-local steps run as external processes.
//!
//! The executable gets the project layout through environment variables:
//!
//! | Variable            | Value                          |
//! |---------------------|--------------------------------|
//! | `YANGA_PROJECT_DIR` | project root                   |
//! | `YANGA_VARIANT`     | selected variant, if any       |
//! | `YANGA_PLATFORM`    | selected platform, if any      |
//! | `YANGA_OUTPUT_DIR`  | the step's output directory    |
//! | `YANGA_STEP_CLASS`  | `class` from the declaration   |

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::pipeline::context::ExecutionContext;
use crate::pipeline::step::{PipelineStep, StepSetup};
use crate::steps::parse_step_config;
use crate::util::diagnostic::UserNotification;
use crate::util::fs::{absolutize, ensure_dir, glob_files, to_posix};
use crate::util::process::with_captured_output;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ScriptStepConfig {
    args: Vec<String>,
    /// Glob patterns relative to the project root
    inputs: Vec<String>,
    /// Relative to the project root
    outputs: Vec<String>,
}

pub struct ScriptStep {
    name: String,
    path: PathBuf,
    class: String,
    args: Vec<String>,
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    output_dir: PathBuf,
}

impl ScriptStep {
    pub fn new(setup: StepSetup<'_>, path: PathBuf, class: String) -> Result<Self> {
        let config: ScriptStepConfig = parse_step_config(setup.config)?;
        let root = &setup.context.project_root_dir;
        Ok(ScriptStep {
            name: setup.config.step.clone(),
            inputs: glob_files(root, &config.inputs)?,
            outputs: config.outputs.iter().map(|f| absolutize(root, Path::new(f))).collect(),
            args: config.args,
            path,
            class,
            output_dir: setup.output_dir,
        })
    }
}

impl PipelineStep for ScriptStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn inputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
        let mut inputs = vec![self.path.clone()];
        inputs.extend(self.inputs.iter().filter(|p| **p != self.path).cloned());
        inputs
    }

    fn outputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
        self.outputs.clone()
    }

    /// Without declared outputs nothing proves the step is up to date.
    fn always_run(&self) -> bool {
        self.outputs.is_empty()
    }

    fn run(&mut self, ctx: &ExecutionContext) -> Result<()> {
        ensure_dir(&self.output_dir)?;
        let mut process = ctx
            .create_process(&self.path)
            .args(&self.args)
            .env("YANGA_PROJECT_DIR", to_posix(&ctx.project_root_dir))
            .env("YANGA_OUTPUT_DIR", to_posix(&self.output_dir))
            .env("YANGA_STEP_CLASS", &self.class);
        if let Some(ref variant) = ctx.variant_name {
            process = process.env("YANGA_VARIANT", variant);
        }
        if let Some(platform) = ctx.platform_name() {
            process = process.env("YANGA_PLATFORM", platform);
        }

        tracing::info!("Running {}", process.display_command());
        let output = process.exec_streaming()?;
        if !output.status.success() {
            bail!(UserNotification::new(with_captured_output(
                format!(
                    "Step '{}' failed: '{}' exited with code {:?}.",
                    self.name,
                    process.display_command(),
                    output.status.code()
                ),
                &output
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::config::StepConfig;
    use crate::pipeline::context::UserRequest;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_script_gets_environment() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(
            tmp.path(),
            "deploy.sh",
            "echo \"$YANGA_VARIANT $YANGA_STEP_CLASS $1\" > \"$YANGA_OUTPUT_DIR/out.txt\"",
        );
        let mut config = StepConfig::new("Deploy");
        config.config = Some(
            serde_yaml::from_str(
                "args: [fast]\ninputs: ['*.sh']\noutputs: [build/Blue/deploy/out.txt]\n",
            )
            .unwrap(),
        );
        let ctx =
            ExecutionContext::new(tmp.path(), UserRequest::variant(Some("Blue".into()), None));
        let output_dir = tmp.path().join("build/Blue/deploy");

        let mut step = ScriptStep::new(
            StepSetup {
                config: &config,
                group: Some("deploy"),
                output_dir: output_dir.clone(),
                context: &ctx,
            },
            script.clone(),
            "MyDeploy".into(),
        )
        .unwrap();
        assert!(!step.always_run());
        assert_eq!(step.inputs(&ctx), vec![script.clone()]);
        step.run(&ctx).unwrap();

        let out = std::fs::read_to_string(output_dir.join("out.txt")).unwrap();
        assert_eq!(out.trim(), "Blue MyDeploy fast");
    }

    #[test]
    fn test_failing_script_is_user_notification() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(tmp.path(), "fail.sh", "exit 3");
        let config = StepConfig::new("Fail");
        let ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));

        let mut step = ScriptStep::new(
            StepSetup {
                config: &config,
                group: None,
                output_dir: tmp.path().join("out"),
                context: &ctx,
            },
            script,
            "Fail".into(),
        )
        .unwrap();
        assert!(step.always_run());
        let err = step.run(&ctx).unwrap_err();
        assert!(err.downcast_ref::<UserNotification>().unwrap().message().contains("'Fail'"));
    }

    #[test]
    fn test_failure_message_carries_script_output() {
        let tmp = TempDir::new().unwrap();
        let script = write_script(
            tmp.path(),
            "fail.sh",
            "echo partial-work\necho boom-stderr >&2\nexit 3",
        );
        let config = StepConfig::new("Fail");
        let ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));

        let mut step = ScriptStep::new(
            StepSetup {
                config: &config,
                group: None,
                output_dir: tmp.path().join("out"),
                context: &ctx,
            },
            script,
            "Fail".into(),
        )
        .unwrap();
        let err = step.run(&ctx).unwrap_err();
        let message = err.downcast_ref::<UserNotification>().unwrap().message().to_string();
        assert!(message.contains("Some(3)"));
        assert!(message.contains("partial-work"));
        assert!(message.contains("boom-stderr"));
    }
}
