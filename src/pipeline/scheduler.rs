//! Step selection and sequential execution.

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::core::config::PipelineConfig;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::fingerprint::{ExecutionOutcome, Executor};
use crate::pipeline::loader::{StepLoader, StepReference, StepSource};
use crate::pipeline::registry::StepRegistry;
use crate::pipeline::step::{PipelineStep, StepFactory, StepSetup};
use crate::steps::script::ScriptStep;
use crate::util::diagnostic::{suggestions, UserNotification};

/// Pick the steps to run from an ordered list.
///
/// - no target: every step
/// - target: every step up to and including the target
/// - target and `single`: only the target
///
/// `single` without a target and an unknown target are errors.
pub fn select_steps<T>(
    steps: Vec<T>,
    name_of: impl Fn(&T) -> &str,
    target: Option<&str>,
    single: bool,
) -> Result<Vec<T>> {
    let Some(target) = target else {
        if single {
            bail!(UserNotification::new("A step name is required to run a single step.")
                .with_help(suggestions::STEP_NOT_FOUND));
        }
        return Ok(steps);
    };

    let Some(position) = steps.iter().position(|s| name_of(s) == target) else {
        bail!(UserNotification::new(format!("Step '{}' not found in the pipeline.", target))
            .with_help(suggestions::STEP_NOT_FOUND));
    };

    let mut steps = steps;
    if single {
        Ok(vec![steps.swap_remove(position)])
    } else {
        steps.truncate(position + 1);
        Ok(steps)
    }
}

/// Resolves the pipeline and selects what to run.
pub struct PipelineScheduler<'a> {
    pipeline: &'a PipelineConfig,
    project_root_dir: &'a Path,
    registry: &'a StepRegistry,
}

impl<'a> PipelineScheduler<'a> {
    pub fn new(
        pipeline: &'a PipelineConfig,
        project_root_dir: &'a Path,
        registry: &'a StepRegistry,
    ) -> Self {
        PipelineScheduler {
            pipeline,
            project_root_dir,
            registry,
        }
    }

    pub fn get_steps_to_run(
        &self,
        step: Option<&str>,
        single: bool,
    ) -> Result<Vec<StepReference<StepFactory>>> {
        let steps = StepLoader::new(self.registry, self.project_root_dir)
            .load_steps(self.pipeline)
            .map_err(UserNotification::from)?;
        select_steps(steps, |s| s.name(), step, single)
    }
}

/// Runs steps one at a time in declaration order.
pub struct PipelineStepsExecutor {
    steps: Vec<StepReference<StepFactory>>,
    force_run: bool,
    verbose: bool,
}

impl PipelineStepsExecutor {
    pub fn new(steps: Vec<StepReference<StepFactory>>) -> Self {
        PipelineStepsExecutor {
            steps,
            force_run: false,
            verbose: false,
        }
    }

    pub fn force_run(mut self, force_run: bool) -> Self {
        self.force_run = force_run;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Execute all steps, publishing each step's context update before
    /// the next one starts. The first failure aborts the run.
    pub fn run(&self, ctx: &mut ExecutionContext) -> Result<Vec<(String, ExecutionOutcome)>> {
        let start = Instant::now();
        let total = self.steps.len();
        let pb = if !self.verbose && total > 1 {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(total);
        for reference in &self.steps {
            if let Some(ref pb) = pb {
                pb.set_message(reference.name().to_string());
            }

            let mut step = instantiate(reference, ctx)?;
            let outcome = Executor::new(step.output_dir())
                .force_run(self.force_run)
                .execute(step.as_mut(), ctx)?;
            step.update_execution_context(ctx)?;
            outcomes.push((reference.name().to_string(), outcome));

            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        let executed = outcomes.iter().filter(|(_, o)| o.executed()).count();
        tracing::info!(
            "Finished {} step(s), {} executed, in {:.2}s",
            total,
            executed,
            start.elapsed().as_secs_f64()
        );
        Ok(outcomes)
    }
}

/// Create the step instance for a resolved reference.
pub fn instantiate(
    reference: &StepReference<StepFactory>,
    ctx: &ExecutionContext,
) -> Result<Box<dyn PipelineStep>> {
    let mut output_dir = ctx.create_artifacts_locator().variant_build_dir;
    if let Some(ref group) = reference.group {
        output_dir.push(group);
    }
    let setup = StepSetup {
        config: &reference.config,
        group: reference.group.as_deref(),
        output_dir,
        context: ctx,
    };
    match reference.source {
        StepSource::Registered(factory) => factory(setup),
        StepSource::File { ref path, ref class } => {
            Ok(Box::new(ScriptStep::new(setup, path.clone(), class.clone())?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StepConfig;
    use crate::pipeline::context::UserRequest;
    use crate::pipeline::registry::Registry;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn names() -> Vec<&'static str> {
        vec!["install", "generate", "build", "test"]
    }

    #[test]
    fn test_select_all() {
        let selected = select_steps(names(), |s| *s, None, false).unwrap();
        assert_eq!(selected, names());
    }

    #[test]
    fn test_select_up_to_target() {
        let selected = select_steps(names(), |s| *s, Some("build"), false).unwrap();
        assert_eq!(selected, vec!["install", "generate", "build"]);
    }

    #[test]
    fn test_select_single() {
        let selected = select_steps(names(), |s| *s, Some("build"), true).unwrap();
        assert_eq!(selected, vec!["build"]);
    }

    #[test]
    fn test_unknown_target_fails() {
        let err = select_steps(names(), |s| *s, Some("deploy"), false).unwrap_err();
        let note = err.downcast_ref::<UserNotification>().unwrap();
        assert!(note.message().contains("'deploy'"));
    }

    #[test]
    fn test_single_without_target_fails() {
        assert!(select_steps(names(), |s| *s, None, true).is_err());
    }

    /// Records its run into a file and publishes an install dir.
    struct MarkerStep {
        name: String,
        dir: PathBuf,
    }

    impl PipelineStep for MarkerStep {
        fn name(&self) -> &str {
            &self.name
        }

        fn output_dir(&self) -> &Path {
            &self.dir
        }

        fn inputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
            Vec::new()
        }

        fn outputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
            vec![self.dir.join(format!("{}.marker", self.name))]
        }

        fn run(&mut self, _ctx: &ExecutionContext) -> Result<()> {
            std::fs::create_dir_all(&self.dir)?;
            std::fs::write(self.dir.join(format!("{}.marker", self.name)), &self.name)?;
            Ok(())
        }

        fn update_execution_context(&self, ctx: &mut ExecutionContext) -> Result<()> {
            ctx.add_install_dirs(vec![self.dir.join("bin")]);
            Ok(())
        }
    }

    fn marker(setup: StepSetup<'_>) -> Result<Box<dyn PipelineStep>> {
        Ok(Box::new(MarkerStep {
            name: setup.config.step.clone(),
            dir: setup.output_dir,
        }))
    }

    fn marker_registry() -> StepRegistry {
        let mut registry: StepRegistry = Registry::empty();
        registry.register("install", marker as StepFactory);
        registry.register("generate", marker as StepFactory);
        registry
    }

    #[test]
    fn test_rerun_skips_but_updates_context() {
        let tmp = TempDir::new().unwrap();
        let pipeline = PipelineConfig::from_groups(vec![(
            "setup",
            vec![StepConfig::new("install"), StepConfig::new("generate")],
        )]);
        let registry = marker_registry();
        let scheduler = PipelineScheduler::new(&pipeline, tmp.path(), &registry);

        let mut ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));
        let first = PipelineStepsExecutor::new(scheduler.get_steps_to_run(None, false).unwrap())
            .verbose(true)
            .run(&mut ctx)
            .unwrap();
        assert!(first.iter().all(|(_, o)| o.executed()));

        let mut ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));
        let second = PipelineStepsExecutor::new(scheduler.get_steps_to_run(None, false).unwrap())
            .verbose(true)
            .run(&mut ctx)
            .unwrap();
        assert!(second.iter().all(|(_, o)| *o == ExecutionOutcome::Skipped));
        assert_eq!(
            ctx.install_dirs(),
            &[tmp.path().join("build/default/setup/bin")]
        );
    }
}
