//! CMake object model and build-system generation.

pub mod artifacts;
pub mod backend;
pub mod builder;
pub mod create_executable;
pub mod generator;
pub mod gtest;
pub mod runner;
pub mod targets_data;
pub mod variant_config;

pub use artifacts::{BuildArtifact, CMakeArtifactsLocator};
pub use backend::{
    CMakeCommand, CMakeCustomCommand, CMakeCustomTarget, CMakeElement, CMakeFile, CMakePath,
};
pub use builder::CMakeBuildSystemGenerator;
pub use generator::{CMakeGenerator, GeneratorRegistry};
pub use runner::CMakeRunner;
