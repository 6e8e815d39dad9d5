//! Include-directory resolution over the required-components graph.
//!
//! For every selected component the resolved list is:
//! 1. its own PRIVATE include directories,
//! 2. its own PUBLIC include directories,
//! 3. the PUBLIC include directories of every required component,
//!    transitively, depth-first in declaration order.
//!
//! Each path appears once, at its first position. Traversal keeps an
//! explicit stack and visited set, so cycles terminate and contribute
//! nothing once a component has been seen.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::component::{Component, ComponentFactory};
use crate::core::config::ComponentConfig;
use crate::core::errors::ComponentError;
use crate::core::pool::ComponentsConfigsPool;
use crate::util::fs::absolutize;

/// Resolves required-component names and collects include directories.
pub struct IncludeDirectoriesResolver<'a> {
    pool: &'a ComponentsConfigsPool,
    factory: &'a ComponentFactory,
}

impl<'a> IncludeDirectoriesResolver<'a> {
    pub fn new(pool: &'a ComponentsConfigsPool, factory: &'a ComponentFactory) -> Self {
        IncludeDirectoriesResolver { pool, factory }
    }

    /// Fill `include_dirs` of every component in place.
    ///
    /// Components that have no definition in the pool are left with no
    /// include directories. Aliases are resolved against the given
    /// components first, which makes a platform's choice of provider win.
    pub fn populate(&self, components: &mut [Component]) -> Result<(), ComponentError> {
        let selected: Vec<(String, Option<String>)> = components
            .iter()
            .map(|c| (c.name.clone(), c.alias.clone()))
            .collect();

        for component in components.iter_mut() {
            let Some(config) = self.pool.get(&component.name) else {
                tracing::debug!(
                    "component `{}` has no definition, no include dirs",
                    component.name
                );
                continue;
            };

            let mut dirs: Vec<PathBuf> = config
                .private_include_directories()
                .map(|dir| component.locate(dir))
                .collect();
            dirs.extend(self.collect_public(config, &selected)?);

            component.include_dirs = unique(dirs);
        }
        Ok(())
    }

    fn collect_public(
        &self,
        root: &'a ComponentConfig,
        selected: &[(String, Option<String>)],
    ) -> Result<Vec<PathBuf>, ComponentError> {
        let mut dirs = Vec::new();
        let mut visited: HashSet<&'a str> = HashSet::new();
        let mut stack: Vec<&'a ComponentConfig> = vec![root];

        while let Some(config) = stack.pop() {
            if !visited.insert(config.name.as_str()) {
                continue;
            }

            let path = self.factory.component_path(config);
            dirs.extend(
                config
                    .public_include_directories()
                    .map(|dir| absolutize(&path, Path::new(dir))),
            );

            // Reverse push keeps declaration order on pop.
            for name in config.required_components.iter().rev() {
                let dep = self.resolve_required(config, name, selected)?;
                if !visited.contains(dep.name.as_str()) {
                    stack.push(dep);
                }
            }
        }

        Ok(dirs)
    }

    /// Resolve a required name: direct name, then an alias provided by a
    /// selected component, then an alias with a single provider in the pool.
    pub fn resolve_required(
        &self,
        requirer: &ComponentConfig,
        name: &str,
        selected: &[(String, Option<String>)],
    ) -> Result<&'a ComponentConfig, ComponentError> {
        if let Some(config) = self.pool.get(name) {
            return Ok(config);
        }

        let selected_providers: Vec<&str> = selected
            .iter()
            .filter(|(_, alias)| alias.as_deref() == Some(name))
            .map(|(provider, _)| provider.as_str())
            .collect();
        if selected_providers.len() > 1 {
            return Err(ComponentError::AmbiguousAlias {
                alias: name.to_string(),
                requested_by: format!("component '{}'", requirer.name),
                candidates: selected_providers.iter().map(|s| s.to_string()).collect(),
            });
        }
        if let Some(config) = selected_providers.first().and_then(|p| self.pool.get(p)) {
            tracing::debug!("`{}` resolved to `{}` via alias", name, config.name);
            return Ok(config);
        }

        let providers = self.pool.providers_of(name);
        match providers.as_slice() {
            [only] => Ok(*only),
            [] => Err(ComponentError::MissingRequired {
                component: requirer.name.clone(),
                required: name.to_string(),
                file: requirer.file.clone(),
            }),
            many => Err(ComponentError::AmbiguousAlias {
                alias: name.to_string(),
                requested_by: format!("component '{}'", requirer.name),
                candidates: many.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }
}

/// Drop repeated paths, keeping the first occurrence.
fn unique(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
