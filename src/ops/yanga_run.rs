//! Implementation of `yanga run`.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::YangaProject;
use crate::pipeline::context::{ExecutionContext, UserRequest};
use crate::pipeline::fingerprint::ExecutionOutcome;
use crate::pipeline::registry::StepRegistry;
use crate::pipeline::scheduler::{PipelineScheduler, PipelineStepsExecutor};
use crate::util::config::YangaSettings;
use crate::util::diagnostic::{suggestions, UserNotification};

/// Options for the run command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Project root directory
    pub project_dir: PathBuf,

    /// Platform to build for (auto-selected when there is only one)
    pub platform: Option<String>,

    /// Variant to build (auto-selected when there is only one)
    pub variant_name: Option<String>,

    /// Restrict the build-system target to one component
    pub component_name: Option<String>,

    /// Build-system target, e.g. `test` or `coverage`
    pub target: Option<String>,

    /// Run the pipeline up to and including this step
    pub step: Option<String>,

    /// Run only `step`
    pub single: bool,

    /// Print the project summary and exit
    pub print: bool,

    /// Ignore recorded fingerprints
    pub force_run: bool,

    pub verbose: bool,
}

/// Load the project, build the execution context and run the pipeline.
///
/// Returns the outcome of every scheduled step; empty when only the
/// project summary was printed.
pub fn run(opts: &RunOptions) -> Result<Vec<(String, ExecutionOutcome)>> {
    run_with_registry(opts, &StepRegistry::new())
}

/// Like [`run`], resolving steps against `registry`.
pub fn run_with_registry(
    opts: &RunOptions,
    registry: &StepRegistry,
) -> Result<Vec<(String, ExecutionOutcome)>> {
    let settings = YangaSettings::load(&opts.project_dir)?;
    let project = YangaProject::load(&opts.project_dir, &settings)?;

    if opts.print {
        project.print_project_info();
        return Ok(Vec::new());
    }

    let Some(ref pipeline) = project.pipeline else {
        bail!(UserNotification::new("No pipeline found in the configuration.")
            .with_help(suggestions::NO_CONFIG));
    };

    let mut ctx = create_execution_context(&project, opts)?;
    let steps = PipelineScheduler::new(pipeline, &project.project_dir, registry)
        .get_steps_to_run(opts.step.as_deref(), opts.single)?;
    tracing::debug!("scheduled {} step(s)", steps.len());

    PipelineStepsExecutor::new(steps)
        .force_run(opts.force_run)
        .verbose(opts.verbose)
        .run(&mut ctx)
}

/// Select variant and platform, resolve the components and assemble the
/// context every step will see.
pub fn create_execution_context(
    project: &YangaProject,
    opts: &RunOptions,
) -> Result<ExecutionContext> {
    let variant = project.select_variant(opts.variant_name.as_deref())?.cloned();
    let platform = project.select_platform(opts.platform.as_deref())?.cloned();
    if let Some(ref v) = variant {
        tracing::info!("Selected variant: {}", v.name);
    }
    if let Some(ref p) = platform {
        tracing::info!("Selected platform: {}", p.name);
    }

    let variant_name = variant.as_ref().map(|v| v.name.clone());
    let user_request = match opts.component_name {
        Some(ref component) => {
            UserRequest::component(variant_name, component.clone(), opts.target.clone())
        }
        None => UserRequest::variant(variant_name, opts.target.clone()),
    };

    let (components, config_file) = match variant {
        Some(ref v) => (
            project.get_variant_components(v, platform.as_ref())?,
            project.variant_config_file(v)?,
        ),
        None => (Vec::new(), None),
    };

    if let Some(ref name) = opts.component_name {
        if variant.is_some() && !components.iter().any(|c| &c.name == name) {
            bail!(UserNotification::new(format!(
                "Component '{}' is not part of the selected variant.",
                name
            )));
        }
    }

    let mut ctx = ExecutionContext::new(&project.project_dir, user_request)
        .with_components(components)
        .with_user_config_files(project.user_config_files())
        .with_config_file(config_file)
        .with_platform(platform);
    if let Some(v) = variant {
        ctx = ctx.with_variant(v);
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::UserRequestScope;
    use tempfile::TempDir;

    const CONFIG: &str = "\
pipeline:
  install:
    - step: InstallTools
      config:
        install_dirs: [tools]
components:
  - name: CompA
    path: src/a
    sources: [a.c]
variants:
  - name: Blue
    components: [CompA]
platforms:
  - name: gtest
";

    fn project(config: &str) -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("yanga.yaml"), config).unwrap();
        tmp
    }

    fn opts(dir: &TempDir) -> RunOptions {
        RunOptions {
            project_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_second_run_skips_steps() {
        let tmp = project(CONFIG);

        let outcomes = run(&opts(&tmp)).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].1.executed());
        assert!(tmp.path().join("build/Blue/gtest/install/InstallTools.deps.json").exists());

        let outcomes = run(&opts(&tmp)).unwrap();
        assert_eq!(outcomes[0].1, ExecutionOutcome::Skipped);

        let forced = RunOptions {
            force_run: true,
            ..opts(&tmp)
        };
        assert!(run(&forced).unwrap()[0].1.executed());
    }

    #[test]
    fn test_print_runs_nothing() {
        let tmp = project(CONFIG);
        let outcomes = run(&RunOptions {
            print: true,
            ..opts(&tmp)
        })
        .unwrap();
        assert!(outcomes.is_empty());
        assert!(!tmp.path().join("build").exists());
    }

    #[test]
    fn test_missing_pipeline() {
        let tmp = project("variants:\n  - name: Blue\n");
        let err = run(&opts(&tmp)).unwrap_err();
        let notification = err.downcast_ref::<UserNotification>().unwrap();
        assert_eq!(notification.message(), "No pipeline found in the configuration.");
    }

    #[test]
    fn test_unknown_step_runs_nothing() {
        let tmp = project(CONFIG);
        let err = run(&RunOptions {
            step: Some("Deploy".into()),
            ..opts(&tmp)
        })
        .unwrap_err();
        assert!(err.downcast_ref::<UserNotification>().unwrap().message().contains("'Deploy'"));
        assert!(!tmp.path().join("build").exists());
    }

    #[test]
    fn test_context_for_component_request() {
        let tmp = project(CONFIG);
        let settings = YangaSettings::default();
        let project = YangaProject::load(tmp.path(), &settings).unwrap();

        let ctx = create_execution_context(
            &project,
            &RunOptions {
                component_name: Some("CompA".into()),
                target: Some("test".into()),
                ..opts(&tmp)
            },
        )
        .unwrap();
        assert_eq!(ctx.user_request.scope, UserRequestScope::Component);
        assert_eq!(ctx.user_request.target_name(), "CompA_test");
        assert_eq!(ctx.variant_name.as_deref(), Some("Blue"));
        assert_eq!(ctx.platform_name(), Some("gtest"));
        assert_eq!(ctx.components.len(), 1);
        assert_eq!(ctx.user_config_files, vec![tmp.path().join("yanga.yaml")]);

        let err = create_execution_context(
            &project,
            &RunOptions {
                component_name: Some("CompZ".into()),
                ..opts(&tmp)
            },
        )
        .unwrap_err();
        assert!(err.downcast_ref::<UserNotification>().unwrap().message().contains("CompZ"));
    }
}
