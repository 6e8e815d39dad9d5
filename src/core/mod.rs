//! Core data structures for Yanga.
//!
//! - Configuration model parsed from `yanga.yaml` files
//! - Components, the component pool and include-directory resolution
//! - Project discovery and variant selection
//! - Build targets recorded for documentation

pub mod artifacts;
pub mod component;
pub mod config;
pub mod errors;
pub mod pool;
pub mod project;
pub mod resolver;
pub mod targets;

pub use artifacts::ProjectArtifactsLocator;
pub use component::{Component, ComponentFactory};
pub use config::{
    ComponentConfig, PipelineConfig, PlatformConfig, StepConfig, UserConfig, VariantConfig,
};
pub use errors::ComponentError;
pub use pool::ComponentsConfigsPool;
pub use project::YangaProject;
pub use resolver::IncludeDirectoriesResolver;
pub use targets::{Target, TargetGraph, TargetType, TargetsData};
