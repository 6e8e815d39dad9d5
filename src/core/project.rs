//! Project discovery: find configuration files, parse them, merge them.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::core::component::{Component, ComponentFactory};
use crate::core::config::{PipelineConfig, PlatformConfig, UserConfig, VariantConfig};
use crate::core::errors::ComponentError;
use crate::core::pool::ComponentsConfigsPool;
use crate::core::resolver::IncludeDirectoriesResolver;
use crate::core::artifacts::ProjectArtifactsLocator;
use crate::util::config::YangaSettings;
use crate::util::diagnostic::{suggestions, UserNotification};

/// Find configuration files below `project_dir`, skipping excluded directories.
///
/// Results are sorted so that merging is deterministic.
pub fn discover_config_files(
    project_dir: &Path,
    file_name: &str,
    exclude_dirs: &[String],
) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(project_dir)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !(entry.file_type().is_dir()
                    && exclude_dirs
                        .iter()
                        .any(|ex| entry.file_name().to_string_lossy() == ex.as_str()))
        })
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!("skipping unreadable path: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && e.file_name().to_string_lossy() == file_name)
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Parse configuration files in parallel. Order of the input is kept.
pub fn parse_config_files(files: &[PathBuf]) -> Result<Vec<UserConfig>> {
    files
        .par_iter()
        .map(|file| UserConfig::from_file(file))
        .collect()
}

/// A fully loaded project.
#[derive(Debug, Clone)]
pub struct YangaProject {
    pub project_dir: PathBuf,
    pub user_configs: Vec<UserConfig>,
    pub pool: ComponentsConfigsPool,
    pub factory: ComponentFactory,
    pub pipeline: Option<PipelineConfig>,
    pub variants: Vec<VariantConfig>,
    pub platforms: Vec<PlatformConfig>,
}

impl YangaProject {
    /// Discover and parse every configuration file of the project.
    pub fn load(project_dir: &Path, settings: &YangaSettings) -> Result<Self> {
        let files = discover_config_files(
            project_dir,
            settings.configuration_file_name(),
            &settings.effective_exclude_dirs(),
        );
        tracing::debug!("found {} configuration file(s)", files.len());
        if files.is_empty() {
            bail!(UserNotification::new(format!(
                "No '{}' configuration file found in '{}'.",
                settings.configuration_file_name(),
                project_dir.display()
            ))
            .with_help(suggestions::NO_CONFIG));
        }
        let user_configs = parse_config_files(&files)?;
        Self::from_user_configs(project_dir, user_configs)
    }

    /// Merge already parsed configurations.
    pub fn from_user_configs(project_dir: &Path, user_configs: Vec<UserConfig>) -> Result<Self> {
        let pool = ComponentsConfigsPool::from_user_configs(&user_configs)
            .map_err(UserNotification::from)?;
        let pipeline = user_configs.iter().find_map(|uc| uc.pipeline.clone());
        let variants = user_configs.iter().flat_map(|uc| uc.variants.iter().cloned()).collect();
        let platforms = user_configs.iter().flat_map(|uc| uc.platforms.iter().cloned()).collect();

        Ok(YangaProject {
            project_dir: project_dir.to_path_buf(),
            factory: ComponentFactory::new(project_dir),
            user_configs,
            pool,
            pipeline,
            variants,
            platforms,
        })
    }

    pub fn user_config_files(&self) -> Vec<PathBuf> {
        self.user_configs.iter().filter_map(|uc| uc.file.clone()).collect()
    }

    pub fn get_variant_config(&self, name: &str) -> Result<&VariantConfig> {
        match self.variants.iter().find(|v| v.name == name) {
            Some(v) => Ok(v),
            None => bail!(UserNotification::new(format!(
                "Variant '{}' not found in the configuration.",
                name
            ))
            .with_help(suggestions::SELECT_VARIANT)),
        }
    }

    pub fn get_platform(&self, name: &str) -> Result<&PlatformConfig> {
        match self.platforms.iter().find(|p| p.name == name) {
            Some(p) => Ok(p),
            None => bail!(UserNotification::new(format!(
                "Platform '{}' not found in the configuration.",
                name
            ))
            .with_help(suggestions::SELECT_PLATFORM)),
        }
    }

    /// Pick the requested variant, or the only one when none was requested.
    pub fn select_variant(&self, requested: Option<&str>) -> Result<Option<&VariantConfig>> {
        if let Some(name) = requested {
            return self.get_variant_config(name).map(Some);
        }
        match self.variants.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only)),
            many => bail!(UserNotification::new(format!(
                "Multiple variants found ({}); select one.",
                many.iter().map(|v| v.name.as_str()).collect::<Vec<_>>().join(", ")
            ))
            .with_help(suggestions::SELECT_VARIANT)),
        }
    }

    /// Pick the requested platform, or the only one when none was requested.
    pub fn select_platform(&self, requested: Option<&str>) -> Result<Option<&PlatformConfig>> {
        if let Some(name) = requested {
            return self.get_platform(name).map(Some);
        }
        match self.platforms.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only)),
            many => bail!(UserNotification::new(format!(
                "Multiple platforms found ({}); select one.",
                many.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
            ))
            .with_help(suggestions::SELECT_PLATFORM)),
        }
    }

    /// The features selection file of a variant, located on disk.
    pub fn variant_config_file(&self, variant: &VariantConfig) -> Result<Option<PathBuf>> {
        let Some(ref file) = variant.features_selection_file else {
            return Ok(None);
        };
        let locator = ProjectArtifactsLocator::new(&self.project_dir, Some(&variant.name), None);
        locator.locate_artifact(file, &[variant.file.clone()]).map(Some)
    }

    /// Components of a variant for a platform, with include dirs resolved.
    ///
    /// Names come from the variant, then the platform, then the variant's
    /// per-platform list. Each name must match a component or the alias of
    /// exactly one component.
    pub fn get_variant_components(
        &self,
        variant: &VariantConfig,
        platform: Option<&PlatformConfig>,
    ) -> Result<Vec<Component>> {
        let variant_ref = format!("variant '{}'", variant.name);
        let mut requested: Vec<(&str, String, Option<PathBuf>)> = variant
            .component_names()
            .map(|n| (n.as_str(), variant_ref.clone(), variant.file.clone()))
            .collect();
        if let Some(platform) = platform {
            let platform_ref = format!("platform '{}'", platform.name);
            requested.extend(
                platform
                    .components
                    .iter()
                    .map(|n| (n.as_str(), platform_ref.clone(), platform.file.clone())),
            );
            if let Some(extra) = variant.platforms.get(&platform.name) {
                requested.extend(
                    extra
                        .components
                        .iter()
                        .map(|n| (n.as_str(), variant_ref.clone(), variant.file.clone())),
                );
            }
        }

        let mut components: Vec<Component> = Vec::new();
        for (name, referenced_by, file) in requested {
            let config = match self.pool.get(name) {
                Some(c) => c,
                None => {
                    let providers = self.pool.providers_of(name);
                    match providers.as_slice() {
                        [only] => *only,
                        [] => {
                            return Err(UserNotification::from(ComponentError::NotFound {
                                name: name.to_string(),
                                referenced_by,
                                file,
                            })
                            .into())
                        }
                        many => {
                            return Err(UserNotification::from(ComponentError::AmbiguousAlias {
                                alias: name.to_string(),
                                requested_by: referenced_by,
                                candidates: many.iter().map(|c| c.name.clone()).collect(),
                            })
                            .into())
                        }
                    }
                }
            };
            if !components.iter().any(|c| c.name == config.name) {
                components.push(self.factory.create(config));
            }
        }

        resolve_subcomponents(&mut components, &self.pool)?;
        IncludeDirectoriesResolver::new(&self.pool, &self.factory)
            .populate(&mut components)
            .map_err(UserNotification::from)?;
        Ok(components)
    }

    /// Log a summary of what was found.
    pub fn print_project_info(&self) {
        tracing::info!("{}", "-".repeat(80));
        tracing::info!("Project directory: {}", self.project_dir.display());
        tracing::info!("Parsed {} configuration file(s).", self.user_configs.len());
        tracing::info!("Found {} component(s).", self.pool.len());
        tracing::info!("Found {} variant(s):", self.variants.len());
        for variant in &self.variants {
            tracing::info!("  - {}", variant.name);
        }
        tracing::info!("Found {} platform(s):", self.platforms.len());
        for platform in &self.platforms {
            tracing::info!("  - {}", platform.name);
        }
        if let Some(ref pipeline) = self.pipeline {
            tracing::info!("Found pipeline config:");
            for group in &pipeline.groups {
                if let Some(ref name) = group.name {
                    tracing::info!("    Group: {}", name);
                }
                for step in &group.steps {
                    tracing::info!("        {}", step.step);
                }
            }
        }
        tracing::info!("{}", "-".repeat(80));
    }
}

/// Mark subcomponents; every referenced subcomponent must be selected too.
fn resolve_subcomponents(components: &mut [Component], pool: &ComponentsConfigsPool) -> Result<()> {
    let mut subcomponents: Vec<String> = Vec::new();
    for component in components.iter() {
        for sub in &component.components {
            if !components.iter().any(|c| &c.name == sub) {
                return Err(UserNotification::from(ComponentError::NotFound {
                    name: sub.clone(),
                    referenced_by: format!("component '{}'", component.name),
                    file: pool.get(&component.name).and_then(|c| c.file.clone()),
                })
                .into());
            }
            subcomponents.push(sub.clone());
        }
    }
    for component in components.iter_mut() {
        if subcomponents.contains(&component.name) {
            component.is_subcomponent = true;
        }
    }
    Ok(())
}
