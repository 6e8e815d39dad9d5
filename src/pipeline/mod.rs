//! Pipeline execution engine.
//!
//! Steps are resolved from the configuration, selected, and then run one
//! after the other. Each step is skipped when its recorded fingerprint
//! still matches the files on disk.

pub mod context;
pub mod fingerprint;
pub mod loader;
pub mod registry;
pub mod scheduler;
pub mod step;

pub use context::{
    ExecutionContext, IncludeDirectoriesProvider, UserRequest, UserRequestScope, UserRequestTarget,
};
pub use fingerprint::{ExecutionOutcome, Executor, RunInfo, RunInfoStatus};
pub use loader::{StepLoader, StepReference, StepResolutionError, StepSource};
pub use registry::{Registry, StepRegistry};
pub use scheduler::{PipelineScheduler, PipelineStepsExecutor};
pub use step::{PipelineStep, StepFactory, StepSetup};
