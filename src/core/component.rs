//! Runtime component model.

use std::path::{Path, PathBuf};

use crate::core::config::{ComponentConfig, TestingConfig};
use crate::util::fs::absolutize;

/// A component selected for a build.
///
/// Built once from its [`ComponentConfig`] and left untouched afterwards,
/// apart from the resolver filling in `include_dirs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub description: Option<String>,
    /// Component root directory (absolute)
    pub path: PathBuf,
    pub alias: Option<String>,
    pub sources: Vec<String>,
    pub test_sources: Vec<String>,
    /// Resolved include directories, private first, deduplicated
    pub include_dirs: Vec<PathBuf>,
    /// Logical dependency names, possibly aliases
    pub required_components: Vec<String>,
    /// Names of subcomponents
    pub components: Vec<String>,
    pub is_subcomponent: bool,
    pub testing: TestingConfig,
}

impl Component {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Component {
            name: name.into(),
            description: None,
            path: path.into(),
            alias: None,
            sources: Vec::new(),
            test_sources: Vec::new(),
            include_dirs: Vec::new(),
            required_components: Vec::new(),
            components: Vec::new(),
            is_subcomponent: false,
            testing: TestingConfig::default(),
        }
    }

    /// Locate a file declared relative to the component root.
    pub fn locate(&self, file: &str) -> PathBuf {
        absolutize(&self.path, Path::new(file))
    }

    /// Absolute productive source paths.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|s| self.locate(s)).collect()
    }

    /// Absolute test source paths, including `testing.sources`.
    pub fn test_source_paths(&self) -> Vec<PathBuf> {
        self.test_sources
            .iter()
            .chain(self.testing.sources.iter())
            .map(|s| self.locate(s))
            .collect()
    }

    /// A component is testable when it declares at least one test source.
    pub fn is_testable(&self) -> bool {
        !self.test_sources.is_empty() || !self.testing.sources.is_empty()
    }
}

/// Creates [`Component`]s from configuration, anchoring paths at the project.
#[derive(Debug, Clone)]
pub struct ComponentFactory {
    project_dir: PathBuf,
}

impl ComponentFactory {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        ComponentFactory {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// The component root: explicit `path`, else the directory of the
    /// defining file, else the project root.
    pub fn component_path(&self, config: &ComponentConfig) -> PathBuf {
        if let Some(ref path) = config.path {
            return absolutize(&self.project_dir, Path::new(path));
        }
        match config.file.as_deref().and_then(Path::parent) {
            Some(dir) => absolutize(&self.project_dir, dir),
            None => self.project_dir.clone(),
        }
    }

    pub fn create(&self, config: &ComponentConfig) -> Component {
        Component {
            name: config.name.clone(),
            description: config.description.clone(),
            path: self.component_path(config),
            alias: config.alias.clone(),
            sources: config.sources.clone(),
            test_sources: config.test_sources.clone(),
            include_dirs: Vec::new(),
            required_components: config.required_components.clone(),
            components: config.components.clone(),
            is_subcomponent: false,
            testing: config.testing.clone().unwrap_or_default(),
        }
    }
}

/// Productive sources of all given components, in order.
pub fn collect_sources(components: &[Component]) -> Vec<PathBuf> {
    components.iter().flat_map(|c| c.source_paths()).collect()
}

/// Directories holding the productive sources, first-seen order.
pub fn collect_source_directories(components: &[Component]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for source in collect_sources(components) {
        if let Some(parent) = source.parent() {
            if !dirs.iter().any(|d| d == parent) {
                dirs.push(parent.to_path_buf());
            }
        }
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_path_resolution() {
        let factory = ComponentFactory::new("/project");

        let mut explicit = ComponentConfig::new("a");
        explicit.path = Some("src/a".into());
        assert_eq!(factory.component_path(&explicit), PathBuf::from("/project/src/a"));

        let mut from_file = ComponentConfig::new("b");
        from_file.file = Some(PathBuf::from("/project/src/b/yanga.yaml"));
        assert_eq!(factory.component_path(&from_file), PathBuf::from("/project/src/b"));

        assert_eq!(
            factory.component_path(&ComponentConfig::new("c")),
            PathBuf::from("/project")
        );
    }

    #[test]
    fn test_sources_are_absolute() {
        let mut config = ComponentConfig::new("a");
        config.path = Some("a".into());
        config.sources = vec!["src/a.c".into(), "../shared/util.c".into()];
        config.test_sources = vec!["test/test_a.cc".into()];

        let component = ComponentFactory::new("/p").create(&config);
        assert_eq!(
            component.source_paths(),
            vec![PathBuf::from("/p/a/src/a.c"), PathBuf::from("/p/shared/util.c")]
        );
        assert!(component.is_testable());
    }

    #[test]
    fn test_collect_source_directories_dedup() {
        let mut a = Component::new("a", "/p/a");
        a.sources = vec!["a1.c".into(), "a2.c".into()];
        let mut b = Component::new("b", "/p/b");
        b.sources = vec!["b.c".into()];

        assert_eq!(
            collect_source_directories(&[a, b]),
            vec![PathBuf::from("/p/a"), PathBuf::from("/p/b")]
        );
    }
}
