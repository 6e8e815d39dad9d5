//! Resolve step declarations to registered classes or external files.
//!
//! Resolution order for one declaration:
//! 1. `module` given: the class must be registered in that module;
//! 2. no `file` given: the class must be a built-in;
//! 3. otherwise the file must exist and is run as an external step.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::config::{PipelineConfig, StepConfig};
use crate::pipeline::registry::Registry;
use crate::util::diagnostic::{suggestions, Diagnostic, UserNotification};

/// A step declaration that could not be resolved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepResolutionError {
    #[error("module `{module}` for step `{step}` in `{group}` is not available")]
    ModuleNotFound {
        group: String,
        step: String,
        module: String,
    },

    #[error("class `{class}` not found in module `{module}` for step `{step}` in `{group}`")]
    ClassNotFound {
        group: String,
        step: String,
        module: String,
        class: String,
    },

    #[error("step `{step}` in `{group}` is not a built-in step")]
    BuiltinNotFound { group: String, step: String },

    #[error("file `{}` for step `{step}` in `{group}` does not exist", .file.display())]
    FileNotFound {
        group: String,
        step: String,
        file: PathBuf,
    },
}

impl StepResolutionError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            StepResolutionError::ModuleNotFound {
                group,
                step,
                module,
            } => Diagnostic::error(format!(
                "Could not load step '{}' of '{}': module '{}' not found.",
                step, group, module
            ))
            .with_suggestion(suggestions::STEP_NOT_FOUND),

            StepResolutionError::ClassNotFound {
                group,
                step,
                module,
                class,
            } => Diagnostic::error(format!(
                "Could not load step '{}' of '{}': class '{}' not found in module '{}'.",
                step, group, class, module
            )),

            StepResolutionError::BuiltinNotFound { group, step } => Diagnostic::error(format!(
                "Could not load step '{}' of '{}': no built-in step with this name.",
                step, group
            ))
            .with_suggestion("help: Add `module` or `file` to the step declaration"),

            StepResolutionError::FileNotFound { group, step, file } => Diagnostic::error(format!(
                "Could not load step '{}' of '{}': file '{}' not found.",
                step,
                group,
                file.display()
            ))
            .with_location(file.clone()),
        }
    }
}

impl From<StepResolutionError> for UserNotification {
    fn from(err: StepResolutionError) -> Self {
        err.to_diagnostic().into()
    }
}

/// Where a resolved step comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSource<F> {
    Registered(F),
    /// External executable run as its own process
    File { path: PathBuf, class: String },
}

/// A resolved, not yet instantiated step.
#[derive(Debug, Clone)]
pub struct StepReference<F> {
    pub group: Option<String>,
    pub config: StepConfig,
    pub source: StepSource<F>,
}

impl<F> StepReference<F> {
    pub fn name(&self) -> &str {
        &self.config.step
    }
}

/// Resolves declarations against a registry.
pub struct StepLoader<'a, F> {
    registry: &'a Registry<F>,
    project_root_dir: &'a Path,
}

impl<'a, F: Copy> StepLoader<'a, F> {
    pub fn new(registry: &'a Registry<F>, project_root_dir: &'a Path) -> Self {
        StepLoader {
            registry,
            project_root_dir,
        }
    }

    /// Resolve every step of a pipeline, keeping declaration order.
    pub fn load_steps(
        &self,
        pipeline: &PipelineConfig,
    ) -> Result<Vec<StepReference<F>>, StepResolutionError> {
        pipeline
            .iter_steps()
            .map(|(group, step)| self.load_step(group, group.unwrap_or("pipeline"), step))
            .collect()
    }

    /// Resolve one declaration. `origin` names the stage (or platform) in errors.
    pub fn load_step(
        &self,
        group: Option<&str>,
        origin: &str,
        config: &StepConfig,
    ) -> Result<StepReference<F>, StepResolutionError> {
        let class = config.class();
        let source = if let Some(ref module) = config.module {
            let classes = self
                .registry
                .module(module)
                .ok_or_else(|| StepResolutionError::ModuleNotFound {
                    group: origin.to_string(),
                    step: config.step.clone(),
                    module: module.clone(),
                })?;
            let factory = classes
                .get(class)
                .copied()
                .ok_or_else(|| StepResolutionError::ClassNotFound {
                    group: origin.to_string(),
                    step: config.step.clone(),
                    module: module.clone(),
                    class: class.to_string(),
                })?;
            StepSource::Registered(factory)
        } else if let Some(ref file) = config.file {
            let path = self.project_root_dir.join(file);
            if !path.is_file() {
                return Err(StepResolutionError::FileNotFound {
                    group: origin.to_string(),
                    step: config.step.clone(),
                    file: path,
                });
            }
            StepSource::File {
                path,
                class: class.to_string(),
            }
        } else {
            let factory = self
                .registry
                .builtin(class)
                .ok_or_else(|| StepResolutionError::BuiltinNotFound {
                    group: origin.to_string(),
                    step: config.step.clone(),
                })?;
            StepSource::Registered(factory)
        };

        tracing::debug!("resolved step `{}` of `{}`", config.step, origin);
        Ok(StepReference {
            group: group.map(str::to_string),
            config: config.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> Registry<u8> {
        let mut registry = Registry::empty();
        registry.register("GenerateBuildSystemFiles", 1);
        registry.register("ExecuteBuild", 2);
        registry.register_in_module("yanga.steps.scoop_install", "ScoopInstall", 3);
        registry
    }

    fn step(name: &str) -> StepConfig {
        StepConfig::new(name)
    }

    #[test]
    fn test_builtin_module_and_file_resolution() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("steps")).unwrap();
        std::fs::write(tmp.path().join("steps/deploy.sh"), "#!/bin/sh\n").unwrap();

        let mut scoop = step("ScoopInstall");
        scoop.module = Some("yanga.steps.scoop_install".into());
        let mut deploy = step("Deploy");
        deploy.file = Some("steps/deploy.sh".into());
        deploy.class_name = Some("MyDeploy".into());

        let pipeline = PipelineConfig::from_groups(vec![
            ("install", vec![scoop]),
            ("build", vec![step("GenerateBuildSystemFiles"), step("ExecuteBuild")]),
            ("deploy", vec![deploy]),
        ]);

        let registry = registry();
        let steps = StepLoader::new(&registry, tmp.path()).load_steps(&pipeline).unwrap();
        let names: Vec<_> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["ScoopInstall", "GenerateBuildSystemFiles", "ExecuteBuild", "Deploy"]
        );
        assert_eq!(steps[0].source, StepSource::Registered(3));
        assert_eq!(steps[2].source, StepSource::Registered(2));
        assert_eq!(steps[0].group.as_deref(), Some("install"));
        assert_eq!(
            steps[3].source,
            StepSource::File {
                path: tmp.path().join("steps/deploy.sh"),
                class: "MyDeploy".into()
            }
        );
    }

    #[test]
    fn test_unknown_builtin_names_group_and_step() {
        let registry = registry();
        let pipeline = PipelineConfig::from_groups(vec![("deploy", vec![step("YangaDeploy")])]);

        let err = StepLoader::new(&registry, Path::new("/p"))
            .load_steps(&pipeline)
            .unwrap_err();
        assert_eq!(
            err,
            StepResolutionError::BuiltinNotFound {
                group: "deploy".into(),
                step: "YangaDeploy".into()
            }
        );
        let note = UserNotification::from(err);
        assert!(note.message().contains("'YangaDeploy'"));
        assert!(note.message().contains("'deploy'"));
    }

    #[test]
    fn test_missing_module_and_class() {
        let registry = registry();

        let mut unknown_module = step("ScoopInstall");
        unknown_module.module = Some("no.such.module".into());
        let err = StepLoader::new(&registry, Path::new("/p"))
            .load_step(Some("install"), "install", &unknown_module)
            .unwrap_err();
        assert!(matches!(err, StepResolutionError::ModuleNotFound { .. }));

        let mut unknown_class = step("WestInstall");
        unknown_class.module = Some("yanga.steps.scoop_install".into());
        let err = StepLoader::new(&registry, Path::new("/p"))
            .load_step(Some("install"), "install", &unknown_class)
            .unwrap_err();
        assert!(matches!(
            err,
            StepResolutionError::ClassNotFound { ref class, .. } if class == "WestInstall"
        ));
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        let registry = registry();
        let mut custom = step("Custom");
        custom.file = Some("steps/missing.py".into());

        let err = StepLoader::new(&registry, tmp.path())
            .load_step(Some("build"), "build", &custom)
            .unwrap_err();
        let diag = err.to_diagnostic();
        assert!(diag.message.contains("steps/missing.py"));
    }
}
