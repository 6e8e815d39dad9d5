//! Registries of step classes.
//!
//! Classes are registered either as built-ins (looked up by bare name) or
//! inside a module namespace (looked up by `module` + class name). The same
//! registry shape serves pipeline steps and CMake generators.

use std::collections::BTreeMap;

use crate::pipeline::step::StepFactory;
use crate::steps;

/// Name-to-factory registry with optional module namespaces.
#[derive(Clone)]
pub struct Registry<F> {
    builtins: BTreeMap<String, F>,
    modules: BTreeMap<String, BTreeMap<String, F>>,
}

impl<F: Copy> Registry<F> {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Registry {
            builtins: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }

    /// Register a built-in class.
    pub fn register(&mut self, class: impl Into<String>, factory: F) {
        self.builtins.insert(class.into(), factory);
    }

    /// Register a class inside a module namespace.
    pub fn register_in_module(
        &mut self,
        module: impl Into<String>,
        class: impl Into<String>,
        factory: F,
    ) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(class.into(), factory);
    }

    pub fn builtin(&self, class: &str) -> Option<F> {
        self.builtins.get(class).copied()
    }

    /// Look up a class in a module. `None` when the module is unknown.
    pub fn module(&self, module: &str) -> Option<&BTreeMap<String, F>> {
        self.modules.get(module)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.builtins.contains_key(class)
    }
}

/// Registry of pipeline steps.
pub type StepRegistry = Registry<StepFactory>;

impl Registry<StepFactory> {
    /// Create a registry with all built-in steps.
    pub fn new() -> Self {
        let mut registry = Registry::empty();

        registry.register(
            "GenerateBuildSystemFiles",
            steps::execute_build::generate_build_system_files as StepFactory,
        );
        registry.register("ExecuteBuild", steps::execute_build::execute_build as StepFactory);
        registry.register("InstallTools", steps::install_tools::install_tools as StepFactory);

        // Module paths accepted for compatibility with existing configurations
        registry.register_in_module(
            "yanga.steps.execute_build",
            "GenerateBuildSystemFiles",
            steps::execute_build::generate_build_system_files as StepFactory,
        );
        registry.register_in_module(
            "yanga.steps.execute_build",
            "ExecuteBuild",
            steps::execute_build::execute_build as StepFactory,
        );
        registry.register_in_module(
            "yanga.steps.install_tools",
            "InstallTools",
            steps::install_tools::install_tools as StepFactory,
        );

        registry
    }
}

impl Default for Registry<StepFactory> {
    fn default() -> Self {
        Self::new()
    }
}
