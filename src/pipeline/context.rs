//! Shared state threaded through every pipeline step and generator.
//!
//! The context only grows during a run: install directories, environment
//! variables and include-directory providers are appended, never removed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::artifacts::ProjectArtifactsLocator;
use crate::core::component::Component;
use crate::core::config::{PlatformConfig, VariantConfig};
use crate::util::process::ProcessBuilder;

/// Well-known target kinds a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum UserRequestTarget {
    All,
    Build,
    Compile,
    Clean,
    Test,
    Mockup,
    Coverage,
    Report,
}

impl UserRequestTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRequestTarget::All => "all",
            UserRequestTarget::Build => "build",
            UserRequestTarget::Compile => "compile",
            UserRequestTarget::Clean => "clean",
            UserRequestTarget::Test => "test",
            UserRequestTarget::Mockup => "mockup",
            UserRequestTarget::Coverage => "coverage",
            UserRequestTarget::Report => "report",
        }
    }
}

impl fmt::Display for UserRequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a request targets the whole variant or one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRequestScope {
    Variant,
    Component,
}

/// What the user asked the build system to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub scope: UserRequestScope,
    pub variant_name: Option<String>,
    pub component_name: Option<String>,
    /// Target kind or a raw target name
    pub target: Option<String>,
}

impl UserRequest {
    pub fn variant(variant_name: Option<String>, target: Option<String>) -> Self {
        UserRequest {
            scope: UserRequestScope::Variant,
            variant_name,
            component_name: None,
            target,
        }
    }

    pub fn component(
        variant_name: Option<String>,
        component_name: impl Into<String>,
        target: Option<String>,
    ) -> Self {
        UserRequest {
            scope: UserRequestScope::Component,
            variant_name,
            component_name: Some(component_name.into()),
            target,
        }
    }

    /// Build-system target: `<component>_<target>` for a component, else
    /// the bare target. Defaults to `all`.
    pub fn target_name(&self) -> String {
        let target = self.target.as_deref().unwrap_or(UserRequestTarget::All.as_str());
        match self.component_name {
            Some(ref component) => format!("{}_{}", component, target),
            None => target.to_string(),
        }
    }

    /// Name of a well-known target of a component, e.g. `CompA_test`.
    pub fn component_target_name(component_name: &str, target: UserRequestTarget) -> String {
        UserRequest::component(None, component_name, Some(target.to_string())).target_name()
    }
}

/// Something that contributes include directories discovered at run time.
pub trait IncludeDirectoriesProvider: fmt::Debug {
    fn include_directories(&self) -> Vec<PathBuf>;
}

/// A fixed list of include directories.
#[derive(Debug, Clone, Default)]
pub struct StaticIncludeDirectories(pub Vec<PathBuf>);

impl IncludeDirectoriesProvider for StaticIncludeDirectories {
    fn include_directories(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

/// Per-invocation execution state.
#[derive(Debug)]
pub struct ExecutionContext {
    pub project_root_dir: PathBuf,
    pub user_request: UserRequest,
    pub variant_name: Option<String>,
    /// Selected variant definition, when a variant was chosen
    pub variant: Option<VariantConfig>,
    pub components: Vec<Component>,
    pub user_config_files: Vec<PathBuf>,
    /// Features selection file of the variant
    pub config_file: Option<PathBuf>,
    pub platform: Option<PlatformConfig>,
    install_dirs: Vec<PathBuf>,
    env_vars: BTreeMap<String, String>,
    include_dirs_providers: Vec<Box<dyn IncludeDirectoriesProvider>>,
    /// Files recording what earlier steps added to this context
    context_files: Vec<PathBuf>,
}

impl ExecutionContext {
    pub fn new(project_root_dir: impl Into<PathBuf>, user_request: UserRequest) -> Self {
        ExecutionContext {
            project_root_dir: project_root_dir.into(),
            variant_name: user_request.variant_name.clone(),
            user_request,
            variant: None,
            components: Vec::new(),
            user_config_files: Vec::new(),
            config_file: None,
            platform: None,
            install_dirs: Vec::new(),
            env_vars: BTreeMap::new(),
            include_dirs_providers: Vec::new(),
            context_files: Vec::new(),
        }
    }

    pub fn with_variant(mut self, variant: VariantConfig) -> Self {
        self.variant_name = Some(variant.name.clone());
        self.variant = Some(variant);
        self
    }

    pub fn with_components(mut self, components: Vec<Component>) -> Self {
        self.components = components;
        self
    }

    pub fn with_user_config_files(mut self, files: Vec<PathBuf>) -> Self {
        self.user_config_files = files;
        self
    }

    pub fn with_config_file(mut self, file: Option<PathBuf>) -> Self {
        self.config_file = file;
        self
    }

    pub fn with_platform(mut self, platform: Option<PlatformConfig>) -> Self {
        self.platform = platform;
        self
    }

    pub fn project_root_dir(&self) -> &Path {
        &self.project_root_dir
    }

    pub fn install_dirs(&self) -> &[PathBuf] {
        &self.install_dirs
    }

    /// Append install directories, skipping ones already known.
    pub fn add_install_dirs(&mut self, dirs: impl IntoIterator<Item = PathBuf>) {
        for dir in dirs {
            if !self.install_dirs.contains(&dir) {
                tracing::debug!("adding install dir {}", dir.display());
                self.install_dirs.push(dir);
            }
        }
    }

    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }

    pub fn add_env_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        self.env_vars.extend(vars);
    }

    pub fn add_include_dirs_provider(&mut self, provider: Box<dyn IncludeDirectoriesProvider>) {
        self.include_dirs_providers.push(provider);
    }

    /// Union of all providers, queried now, first occurrence kept.
    pub fn include_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for dir in self
            .include_dirs_providers
            .iter()
            .flat_map(|p| p.include_directories())
        {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    pub fn context_files(&self) -> &[PathBuf] {
        &self.context_files
    }

    /// Register a file whose content changes whenever a step's contribution
    /// to this context does. Steps consuming the context fingerprint it.
    pub fn add_context_file(&mut self, file: PathBuf) {
        if !self.context_files.contains(&file) {
            self.context_files.push(file);
        }
    }

    pub fn platform_name(&self) -> Option<&str> {
        self.platform.as_ref().map(|p| p.name.as_str())
    }

    /// A subprocess running in the project root with install dirs on `PATH`.
    pub fn create_process(&self, program: impl AsRef<Path>) -> ProcessBuilder {
        ProcessBuilder::new(program)
            .cwd(&self.project_root_dir)
            .prepend_path(self.install_dirs.iter())
            .envs(self.env_vars.iter())
    }

    pub fn create_artifacts_locator(&self) -> ProjectArtifactsLocator {
        ProjectArtifactsLocator::new(
            &self.project_root_dir,
            self.variant_name.as_deref(),
            self.platform_name(),
        )
    }
}
