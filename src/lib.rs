//! Yanga - a pipeline-driven build orchestrator for multi-variant C/C++ projects
//!
//! This crate provides the core library functionality for Yanga,
//! including configuration loading, component resolution, pipeline
//! scheduling with fingerprint-based skipping, and CMake generation.

pub mod cmake;
pub mod core;
pub mod ops;
pub mod pipeline;
pub mod steps;
pub mod util;

pub use crate::core::{Component, YangaProject};
pub use crate::pipeline::{ExecutionContext, PipelineStep, UserRequest};
pub use crate::util::{UserNotification, YangaSettings};
