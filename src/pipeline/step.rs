//! The pipeline step contract.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::config::StepConfig;
use crate::pipeline::context::ExecutionContext;

/// A unit of pipeline work with declared inputs and outputs.
///
/// The fingerprint store hashes `inputs` and `outputs` after `run` to
/// decide whether the next invocation can skip the step.
pub trait PipelineStep {
    /// Name used for logging and for the run-info sidecar file.
    fn name(&self) -> &str;

    /// Directory holding the step's run-info sidecar.
    fn output_dir(&self) -> &Path;

    fn inputs(&self, ctx: &ExecutionContext) -> Vec<PathBuf>;

    fn outputs(&self, ctx: &ExecutionContext) -> Vec<PathBuf>;

    /// Steps whose dependencies are tracked elsewhere (the build tool
    /// itself) run on every invocation.
    fn always_run(&self) -> bool {
        false
    }

    fn run(&mut self, ctx: &ExecutionContext) -> Result<()>;

    /// Publish results into the shared context.
    ///
    /// Called after `run` and also when the step was skipped, so it must
    /// rebuild its contribution from whatever the step persisted earlier.
    fn update_execution_context(&self, _ctx: &mut ExecutionContext) -> Result<()> {
        Ok(())
    }
}

/// Everything a step factory gets to build a step instance.
pub struct StepSetup<'a> {
    pub config: &'a StepConfig,
    pub group: Option<&'a str>,
    /// Default output directory for the step's group
    pub output_dir: PathBuf,
    pub context: &'a ExecutionContext,
}

/// Constructor registered for a step class.
pub type StepFactory = fn(StepSetup<'_>) -> Result<Box<dyn PipelineStep>>;
