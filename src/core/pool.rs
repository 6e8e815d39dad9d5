//! Pool of all component definitions found in a project.

use std::collections::HashMap;

use crate::core::config::{ComponentConfig, UserConfig};
use crate::core::errors::ComponentError;

/// Component definitions keyed by name, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ComponentsConfigsPool {
    configs: Vec<ComponentConfig>,
    index: HashMap<String, usize>,
}

impl ComponentsConfigsPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool, rejecting duplicate names.
    pub fn from_configs(
        configs: impl IntoIterator<Item = ComponentConfig>,
    ) -> Result<Self, ComponentError> {
        let mut pool = ComponentsConfigsPool::new();
        for config in configs {
            pool.add(config)?;
        }
        Ok(pool)
    }

    /// Merge the components of several parsed files.
    pub fn from_user_configs(user_configs: &[UserConfig]) -> Result<Self, ComponentError> {
        Self::from_configs(
            user_configs
                .iter()
                .flat_map(|uc| uc.components.iter().cloned()),
        )
    }

    /// Add a definition; a second definition of the same name is an error.
    pub fn add(&mut self, config: ComponentConfig) -> Result<(), ComponentError> {
        if let Some(existing) = self.get(&config.name) {
            return Err(ComponentError::DuplicateDefinition {
                name: config.name.clone(),
                first: existing.file.clone(),
                second: config.file.clone(),
            });
        }
        self.insert(config);
        Ok(())
    }

    /// Insert or replace a definition.
    pub fn insert(&mut self, config: ComponentConfig) {
        match self.index.get(&config.name) {
            Some(&i) => self.configs[i] = config,
            None => {
                self.index.insert(config.name.clone(), self.configs.len());
                self.configs.push(config);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ComponentConfig> {
        self.index.get(name).map(|&i| &self.configs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All definitions declaring the given alias.
    pub fn providers_of(&self, alias: &str) -> Vec<&ComponentConfig> {
        self.configs
            .iter()
            .filter(|c| c.alias.as_deref() == Some(alias))
            .collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &ComponentConfig> + '_ {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn in_file(name: &str, file: &str) -> ComponentConfig {
        let mut c = ComponentConfig::new(name);
        c.file = Some(PathBuf::from(file));
        c
    }

    #[test]
    fn test_duplicate_definition_names_both_files() {
        let err = ComponentsConfigsPool::from_configs(vec![
            in_file("main", "a/yanga.yaml"),
            in_file("util", "a/yanga.yaml"),
            in_file("main", "b/yanga.yaml"),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            ComponentError::DuplicateDefinition {
                name: "main".into(),
                first: Some("a/yanga.yaml".into()),
                second: Some("b/yanga.yaml".into()),
            }
        );
    }

    #[test]
    fn test_insert_replaces_keeping_order() {
        let mut pool = ComponentsConfigsPool::new();
        pool.insert(ComponentConfig::new("a"));
        pool.insert(ComponentConfig::new("b"));
        let mut a2 = ComponentConfig::new("a");
        a2.alias = Some("alpha".into());
        pool.insert(a2);

        let names: Vec<_> = pool.values().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(pool.providers_of("alpha").len(), 1);
    }
}
