//! Run-info fingerprints for incremental pipeline runs.
//!
//! After a step runs, the content hash of every declared input and output
//! is written to `<output_dir>/<StepName>.deps.json`. The next invocation
//! compares the recorded hashes with the files on disk and skips the step
//! when nothing changed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::context::ExecutionContext;
use crate::pipeline::step::PipelineStep;
use crate::util::fs::{normalize_path, write_string};
use crate::util::hash::sha256_file_if_exists;

/// Sidecar file extension.
pub const RUN_INFO_FILE_EXTENSION: &str = ".deps.json";

/// Result of comparing a recorded run with the current files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunInfoStatus {
    Match,
    NoInfo,
    FileNotFound,
    FileChanged,
}

impl RunInfoStatus {
    pub fn should_run(&self) -> bool {
        !matches!(self, RunInfoStatus::Match)
    }

    pub fn message(&self) -> &'static str {
        match self {
            RunInfoStatus::Match => "Nothing changed. Previous execution info matches.",
            RunInfoStatus::NoInfo => "No previous execution info found.",
            RunInfoStatus::FileNotFound => "File not found.",
            RunInfoStatus::FileChanged => "File has changed.",
        }
    }
}

impl fmt::Display for RunInfoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Recorded hashes; `None` marks a file that did not exist at record time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub inputs: BTreeMap<String, Option<String>>,
    pub outputs: BTreeMap<String, Option<String>>,
}

impl RunInfo {
    /// Hash the given files as they are now.
    pub fn capture(inputs: &[PathBuf], outputs: &[PathBuf]) -> Result<Self> {
        Ok(RunInfo {
            inputs: hash_files(inputs)?,
            outputs: hash_files(outputs)?,
        })
    }

    /// Load a sidecar. A missing or unreadable sidecar yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                tracing::warn!("ignoring corrupt run info {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("failed to serialize run info")?;
        write_string(path, &content)
    }

    /// Compare with the files on disk and with the currently declared paths.
    pub fn check(&self, inputs: &[PathBuf], outputs: &[PathBuf]) -> Result<RunInfoStatus> {
        for recorded in [&self.inputs, &self.outputs] {
            for (path, previous) in recorded {
                let current = sha256_file_if_exists(Path::new(path))?;
                match (previous, current) {
                    (_, None) => return Ok(RunInfoStatus::FileNotFound),
                    (None, Some(_)) => return Ok(RunInfoStatus::FileChanged),
                    (Some(prev), Some(cur)) if *prev != cur => {
                        return Ok(RunInfoStatus::FileChanged);
                    }
                    _ => {}
                }
            }
        }
        // A step that now declares other files than last time must rerun.
        if !same_keys(&self.inputs, inputs) || !same_keys(&self.outputs, outputs) {
            return Ok(RunInfoStatus::FileChanged);
        }
        Ok(RunInfoStatus::Match)
    }
}

fn path_key(path: &Path) -> String {
    normalize_path(path).to_string_lossy().into_owned()
}

fn hash_files(paths: &[PathBuf]) -> Result<BTreeMap<String, Option<String>>> {
    let mut hashes = BTreeMap::new();
    for path in paths {
        hashes.insert(path_key(path), sha256_file_if_exists(path)?);
    }
    Ok(hashes)
}

fn same_keys(recorded: &BTreeMap<String, Option<String>>, declared: &[PathBuf]) -> bool {
    let mut keys: Vec<String> = declared.iter().map(|p| path_key(p)).collect();
    keys.sort();
    keys.dedup();
    keys.len() == recorded.len() && keys.iter().all(|k| recorded.contains_key(k))
}

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The step body ran; carries the status that triggered it
    Executed(RunInfoStatus),
    Skipped,
}

impl ExecutionOutcome {
    pub fn executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed(_))
    }
}

/// Runs steps whose fingerprints no longer match.
pub struct Executor {
    cache_dir: PathBuf,
    force_run: bool,
}

impl Executor {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Executor {
            cache_dir: cache_dir.into(),
            force_run: false,
        }
    }

    /// Run steps even when their fingerprint matches.
    pub fn force_run(mut self, force_run: bool) -> Self {
        self.force_run = force_run;
        self
    }

    pub fn run_info_file(&self, step_name: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}", step_name, RUN_INFO_FILE_EXTENSION))
    }

    pub fn previous_run_info_matches(
        &self,
        step: &dyn PipelineStep,
        ctx: &ExecutionContext,
    ) -> Result<RunInfoStatus> {
        match RunInfo::load(&self.run_info_file(step.name()))? {
            None => Ok(RunInfoStatus::NoInfo),
            Some(info) => info.check(&step.inputs(ctx), &step.outputs(ctx)),
        }
    }

    pub fn store_run_info(&self, step: &dyn PipelineStep, ctx: &ExecutionContext) -> Result<()> {
        let info = RunInfo::capture(&step.inputs(ctx), &step.outputs(ctx))?;
        info.save(&self.run_info_file(step.name()))
    }

    /// Run the step if needed and record its fingerprint afterwards.
    pub fn execute(
        &self,
        step: &mut dyn PipelineStep,
        ctx: &ExecutionContext,
    ) -> Result<ExecutionOutcome> {
        let status = self.previous_run_info_matches(step, ctx)?;
        if status.should_run() || self.force_run || step.always_run() {
            tracing::info!("Step '{}' must run. {}", step.name(), status.message());
            step.run(ctx)
                .with_context(|| format!("step '{}' failed", step.name()))?;
            self.store_run_info(step, ctx)?;
            return Ok(ExecutionOutcome::Executed(status));
        }
        tracing::info!("Step '{}' execution skipped. {}", step.name(), status.message());
        Ok(ExecutionOutcome::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::UserRequest;
    use tempfile::TempDir;

    /// Copies its input to its output and counts runs.
    struct CopyStep {
        dir: PathBuf,
        input: PathBuf,
        output: PathBuf,
        runs: usize,
        write_output: bool,
    }

    impl CopyStep {
        fn new(dir: &Path) -> Self {
            CopyStep {
                dir: dir.to_path_buf(),
                input: dir.join("in.txt"),
                output: dir.join("out.txt"),
                runs: 0,
                write_output: true,
            }
        }
    }

    impl PipelineStep for CopyStep {
        fn name(&self) -> &str {
            "CopyStep"
        }

        fn output_dir(&self) -> &Path {
            &self.dir
        }

        fn inputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
            vec![self.input.clone()]
        }

        fn outputs(&self, _ctx: &ExecutionContext) -> Vec<PathBuf> {
            vec![self.output.clone()]
        }

        fn run(&mut self, _ctx: &ExecutionContext) -> Result<()> {
            self.runs += 1;
            if self.write_output {
                std::fs::copy(&self.input, &self.output)?;
            }
            Ok(())
        }
    }

    fn ctx(dir: &Path) -> ExecutionContext {
        ExecutionContext::new(dir, UserRequest::variant(None, None))
    }

    #[test]
    fn test_second_run_is_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        let executor = Executor::new(tmp.path());

        assert_eq!(
            executor.execute(&mut step, &ctx).unwrap(),
            ExecutionOutcome::Executed(RunInfoStatus::NoInfo)
        );
        assert_eq!(executor.execute(&mut step, &ctx).unwrap(), ExecutionOutcome::Skipped);
        assert_eq!(step.runs, 1);
        assert!(tmp.path().join("CopyStep.deps.json").exists());
    }

    #[test]
    fn test_changed_input_reruns() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        let executor = Executor::new(tmp.path());
        executor.execute(&mut step, &ctx).unwrap();

        std::fs::write(tmp.path().join("in.txt"), "b").unwrap();
        assert_eq!(
            executor.previous_run_info_matches(&step, &ctx).unwrap(),
            RunInfoStatus::FileChanged
        );
        executor.execute(&mut step, &ctx).unwrap();
        assert_eq!(step.runs, 2);
    }

    #[test]
    fn test_deleted_output_reruns() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        let executor = Executor::new(tmp.path());
        executor.execute(&mut step, &ctx).unwrap();

        std::fs::remove_file(tmp.path().join("out.txt")).unwrap();
        assert_eq!(
            executor.previous_run_info_matches(&step, &ctx).unwrap(),
            RunInfoStatus::FileNotFound
        );
    }

    #[test]
    fn test_missing_output_is_recorded_and_forces_rerun() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        step.write_output = false;
        let executor = Executor::new(tmp.path());

        executor.execute(&mut step, &ctx).unwrap();
        let info = RunInfo::load(&executor.run_info_file("CopyStep")).unwrap().unwrap();
        assert_eq!(info.outputs.values().next().unwrap(), &None);

        assert_eq!(
            executor.execute(&mut step, &ctx).unwrap(),
            ExecutionOutcome::Executed(RunInfoStatus::FileNotFound)
        );
    }

    #[test]
    fn test_force_run() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        Executor::new(tmp.path()).execute(&mut step, &ctx).unwrap();

        let outcome = Executor::new(tmp.path())
            .force_run(true)
            .execute(&mut step, &ctx)
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Executed(RunInfoStatus::Match));
        assert_eq!(step.runs, 2);
    }

    #[test]
    fn test_deleting_sidecar_forces_rerun() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        let executor = Executor::new(tmp.path());
        executor.execute(&mut step, &ctx).unwrap();

        std::fs::write(executor.run_info_file("CopyStep"), "{ not json").unwrap();
        assert_eq!(
            executor.previous_run_info_matches(&step, &ctx).unwrap(),
            RunInfoStatus::NoInfo
        );
        std::fs::remove_file(executor.run_info_file("CopyStep")).unwrap();
        assert_eq!(
            executor.previous_run_info_matches(&step, &ctx).unwrap(),
            RunInfoStatus::NoInfo
        );
    }

    #[test]
    fn test_sidecar_is_pretty_json() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("in.txt"), "a").unwrap();
        let ctx = ctx(tmp.path());
        let mut step = CopyStep::new(tmp.path());
        let executor = Executor::new(tmp.path());
        executor.execute(&mut step, &ctx).unwrap();

        let content = std::fs::read_to_string(executor.run_info_file("CopyStep")).unwrap();
        assert!(content.contains("\"inputs\": {\n"));
        assert!(content.contains("\"outputs\""));
    }
}
