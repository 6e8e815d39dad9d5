//! CMake generator contract and registry.

use std::path::PathBuf;

use anyhow::Result;
use serde::de::DeserializeOwned;

use crate::cmake::artifacts::CMakeArtifactsLocator;
use crate::cmake::backend::CMakeElement;
use crate::cmake::{create_executable, gtest, targets_data, variant_config};
use crate::core::config::StepConfig;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::registry::Registry;
use crate::util::diagnostic::UserNotification;

/// Produces a block of CMake elements for the variant file.
pub trait CMakeGenerator {
    fn generate(&self) -> Result<Vec<CMakeElement>>;
}

/// Everything a generator factory gets.
pub struct GeneratorSetup<'a> {
    pub config: &'a StepConfig,
    /// Directory holding the generated CMake project
    pub output_dir: PathBuf,
    pub context: &'a ExecutionContext,
}

impl GeneratorSetup<'_> {
    pub fn artifacts_locator(&self) -> CMakeArtifactsLocator {
        CMakeArtifactsLocator::new(&self.output_dir, self.context.create_artifacts_locator())
    }

    /// Deserialize the free-form `config` mapping; absent means default.
    pub fn parse_config<T: DeserializeOwned + Default>(&self) -> Result<T> {
        let Some(ref mapping) = self.config.config else {
            return Ok(T::default());
        };
        let config =
            serde_yaml::from_value(serde_yaml::Value::Mapping(mapping.clone())).map_err(|e| {
                UserNotification::new(format!(
                    "Invalid configuration for CMake generator '{}': {}",
                    self.config.step, e
                ))
            })?;
        Ok(config)
    }
}

/// Constructor registered for a generator class.
pub type GeneratorFactory = for<'a> fn(GeneratorSetup<'a>) -> Result<Box<dyn CMakeGenerator + 'a>>;

/// Registry of CMake generators.
pub type GeneratorRegistry = Registry<GeneratorFactory>;

impl Registry<GeneratorFactory> {
    /// Create a registry with all built-in generators.
    pub fn new() -> Self {
        let mut registry = Registry::empty();

        let builtins: [(&str, &str, GeneratorFactory); 4] = [
            (
                "yanga.cmake.create_executable",
                "CreateExecutableCMakeGenerator",
                create_executable::create_executable_generator,
            ),
            ("yanga.cmake.gtest", "GTestCMakeGenerator", gtest::gtest_generator),
            (
                "yanga.cmake.variant_config",
                "ConfigCMakeGenerator",
                variant_config::config_generator,
            ),
            (
                "yanga.cmake.targets_data",
                "TargetsDataCMakeGenerator",
                targets_data::targets_data_generator,
            ),
        ];
        for (module, class, factory) in builtins {
            registry.register(class, factory);
            registry.register_in_module(module, class, factory);
        }

        registry
    }
}

impl Default for Registry<GeneratorFactory> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_generators_registered() {
        let registry = GeneratorRegistry::new();
        for name in [
            "CreateExecutableCMakeGenerator",
            "GTestCMakeGenerator",
            "ConfigCMakeGenerator",
            "TargetsDataCMakeGenerator",
        ] {
            assert!(registry.contains(name), "{} missing", name);
        }
        assert!(registry
            .module("yanga.cmake.gtest")
            .unwrap()
            .contains_key("GTestCMakeGenerator"));
    }
}
