//! Project configuration data model.
//!
//! A project consists of any number of `yanga.yaml` files. Each one may
//! declare components, variants, platforms and at most one pipeline that
//! is honored (the first one found wins).

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::util::diagnostic::UserNotification;

/// One step declaration in a pipeline or generator list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name; also the class name when `class` is not given
    pub step: String,

    /// Registered module namespace providing the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Path to an external step executable, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Class name when it differs from the step name
    #[serde(
        default,
        rename = "class",
        alias = "class_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Accepted for compatibility, never enforced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,

    /// Free-form settings handed to the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_yaml::Mapping>,
}

impl StepConfig {
    /// Create a declaration for a built-in step.
    pub fn new(step: impl Into<String>) -> Self {
        StepConfig {
            step: step.into(),
            module: None,
            file: None,
            class_name: None,
            description: None,
            timeout_sec: None,
            config: None,
        }
    }

    /// The class to look up: `class` if given, else the step name.
    pub fn class(&self) -> &str {
        self.class_name.as_deref().unwrap_or(&self.step)
    }
}

/// A named group of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineGroup {
    /// Group (stage) name; `None` for a flat pipeline list
    pub name: Option<String>,
    pub steps: Vec<StepConfig>,
}

/// Ordered pipeline: groups keep the order they have in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub groups: Vec<PipelineGroup>,
}

impl PipelineConfig {
    /// Build a pipeline from `(group, steps)` pairs.
    pub fn from_groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<StepConfig>)>,
        S: Into<String>,
    {
        PipelineConfig {
            groups: groups
                .into_iter()
                .map(|(name, steps)| PipelineGroup {
                    name: Some(name.into()),
                    steps,
                })
                .collect(),
        }
    }

    /// Iterate over `(group, step)` in declaration order.
    pub fn iter_steps(&self) -> impl Iterator<Item = (Option<&str>, &StepConfig)> + '_ {
        self.groups
            .iter()
            .flat_map(|g| g.steps.iter().map(move |s| (g.name.as_deref(), s)))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.steps.is_empty())
    }
}

impl<'de> Deserialize<'de> for PipelineConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PipelineVisitor;

        impl<'de> Visitor<'de> for PipelineVisitor {
            type Value = PipelineConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of group name to step list, or a step list")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut groups: Vec<PipelineGroup> = Vec::new();
                while let Some((name, steps)) = map.next_entry::<String, Vec<StepConfig>>()? {
                    if groups.iter().any(|g| g.name.as_deref() == Some(name.as_str())) {
                        return Err(de::Error::custom(format!(
                            "pipeline group `{}` is declared twice",
                            name
                        )));
                    }
                    groups.push(PipelineGroup {
                        name: Some(name),
                        steps,
                    });
                }
                Ok(PipelineConfig { groups })
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut steps = Vec::new();
                while let Some(step) = seq.next_element::<StepConfig>()? {
                    steps.push(step);
                }
                Ok(PipelineConfig {
                    groups: vec![PipelineGroup { name: None, steps }],
                })
            }
        }

        deserializer.deserialize_any(PipelineVisitor)
    }
}

/// Visibility of an include directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncludeDirectoryScope {
    #[default]
    Public,
    Private,
}

/// An include directory relative to the component path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeDirectory {
    pub path: String,
    pub scope: IncludeDirectoryScope,
}

impl IncludeDirectory {
    pub fn public(path: impl Into<String>) -> Self {
        IncludeDirectory {
            path: path.into(),
            scope: IncludeDirectoryScope::Public,
        }
    }

    pub fn private(path: impl Into<String>) -> Self {
        IncludeDirectory {
            path: path.into(),
            scope: IncludeDirectoryScope::Private,
        }
    }
}

impl<'de> Deserialize<'de> for IncludeDirectory {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // A bare string is shorthand for a public directory.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Path(String),
            Full {
                path: String,
                #[serde(default)]
                scope: IncludeDirectoryScope,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Path(path) => IncludeDirectory::public(path),
            Raw::Full { path, scope } => IncludeDirectory { path, scope },
        })
    }
}

/// Mock generation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockingConfig {
    pub enabled: Option<bool>,
    pub strict: Option<bool>,
    pub exclude_symbol_patterns: Vec<String>,
}

/// Component testing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    pub sources: Vec<String>,
    pub mocking: Option<MockingConfig>,
}

/// Declarative component definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    pub name: String,
    pub description: Option<String>,
    /// Component root, relative to the project root
    pub path: Option<String>,
    /// Alternate name other components may require
    pub alias: Option<String>,
    pub sources: Vec<String>,
    pub test_sources: Vec<String>,
    pub include_directories: Vec<IncludeDirectory>,
    /// Logical dependency names, possibly aliases
    pub required_components: Vec<String>,
    /// Subcomponent names
    pub components: Vec<String>,
    pub testing: Option<TestingConfig>,
    /// File this definition was loaded from
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ComponentConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn public_include_directories(&self) -> impl Iterator<Item = &str> + '_ {
        self.include_directories
            .iter()
            .filter(|d| d.scope == IncludeDirectoryScope::Public)
            .map(|d| d.path.as_str())
    }

    pub fn private_include_directories(&self) -> impl Iterator<Item = &str> + '_ {
        self.include_directories
            .iter()
            .filter(|d| d.scope == IncludeDirectoryScope::Private)
            .map(|d| d.path.as_str())
    }
}

/// A configuration blob identified by `id`, given inline or as a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_yaml::Mapping>,
}

/// Per-platform additions for a variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantPlatformConfig {
    pub components: Vec<String>,
    pub configs: Vec<ConfigFile>,
}

/// Legacy bill-of-materials block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantBom {
    pub components: Vec<String>,
}

/// Product variant definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    pub name: String,
    pub description: Option<String>,
    pub components: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bom: Option<VariantBom>,
    pub platforms: BTreeMap<String, VariantPlatformConfig>,
    pub features_selection_file: Option<String>,
    pub configs: Vec<ConfigFile>,
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl VariantConfig {
    pub fn new(name: impl Into<String>) -> Self {
        VariantConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Component names from `components` followed by the `bom` list.
    pub fn component_names(&self) -> impl Iterator<Item = &String> + '_ {
        self.components
            .iter()
            .chain(self.bom.iter().flat_map(|b| b.components.iter()))
    }
}

/// Target platform definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub name: String,
    pub description: Option<String>,
    /// CMake toolchain file, relative to the project root or the platform file
    pub toolchain_file: Option<String>,
    /// CMake generators, resolved like pipeline steps
    pub cmake_generators: Vec<StepConfig>,
    /// Components added to every variant built for this platform
    pub components: Vec<String>,
    pub configs: Vec<ConfigFile>,
    pub build_types: Vec<String>,
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl PlatformConfig {
    pub fn new(name: impl Into<String>) -> Self {
        PlatformConfig {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Contents of one configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub pipeline: Option<PipelineConfig>,
    pub platforms: Vec<PlatformConfig>,
    pub variants: Vec<VariantConfig>,
    pub components: Vec<ComponentConfig>,
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl UserConfig {
    /// Parse a configuration file and stamp every entry with its origin.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file: {}", path.display()))?;
        let mut config = Self::from_str_named(&contents, &path.display().to_string())?;
        config.set_file(path);
        Ok(config)
    }

    /// Parse configuration text. `name` only appears in error messages.
    pub fn from_str_named(contents: &str, name: &str) -> Result<Self> {
        // An empty document is a valid, empty configuration.
        if contents.trim().is_empty() {
            return Ok(UserConfig::default());
        }
        let config: UserConfig = serde_yaml::from_str(contents).map_err(|e| {
            UserNotification::new(format!(
                "Failed parsing configuration file '{}'.\nError: {}",
                name, e
            ))
        })?;
        Ok(config)
    }

    fn set_file(&mut self, path: &Path) {
        self.file = Some(path.to_path_buf());
        for component in &mut self.components {
            component.file = Some(path.to_path_buf());
        }
        for variant in &mut self.variants {
            variant.file = Some(path.to_path_buf());
        }
        for platform in &mut self.platforms {
            platform.file = Some(path.to_path_buf());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PIPELINE_YAML: &str = r#"
pipeline:
  install:
    - step: ScoopInstall
      module: yanga.steps.scoop_install
      description: Install dependencies
      timeout_sec: 120
    - step: MyInstall
      file: user/install.sh
      class: CustomInstall
  build:
    - step: GenerateBuildSystemFiles
    - step: ExecuteBuild
  deploy:
    - step: YangaDeploy
"#;

    #[test]
    fn test_pipeline_keeps_group_order() {
        let config = UserConfig::from_str_named(PIPELINE_YAML, "test").unwrap();
        let pipeline = config.pipeline.unwrap();

        let groups: Vec<_> = pipeline
            .groups
            .iter()
            .map(|g| g.name.clone().unwrap())
            .collect();
        assert_eq!(groups, vec!["install", "build", "deploy"]);

        let install = &pipeline.groups[0].steps;
        assert_eq!(install[0].step, "ScoopInstall");
        assert_eq!(install[0].timeout_sec, Some(120));
        assert_eq!(install[1].class(), "CustomInstall");
        assert_eq!(install[1].file.as_deref(), Some("user/install.sh"));
        assert_eq!(pipeline.groups[1].steps[0].class(), "GenerateBuildSystemFiles");
    }

    #[test]
    fn test_flat_pipeline_list() {
        let yaml = "pipeline:\n  - step: A\n  - step: B\n";
        let pipeline = UserConfig::from_str_named(yaml, "test").unwrap().pipeline.unwrap();

        let steps: Vec<_> = pipeline.iter_steps().map(|(g, s)| (g, s.step.as_str())).collect();
        assert_eq!(steps, vec![(None, "A"), (None, "B")]);
    }

    #[test]
    fn test_components_and_variants() {
        let yaml = r#"
components:
  - name: arduino_core
    sources: [wiring.c]
    required_components: [pins]
    include_directories:
      - path: core
        scope: PUBLIC
      - path: src
        scope: PRIVATE
      - legacy
  - name: uno_pins
    alias: pins
variants:
  - name: Uno
    components: [arduino_core]
    bom:
      components: [uno_pins]
    platforms:
      gtest:
        components: [test_utils]
    configs:
      - id: vars
        content:
          LED_PIN: 13
"#;
        let config = UserConfig::from_str_named(yaml, "test").unwrap();
        let core = &config.components[0];
        assert_eq!(core.public_include_directories().collect::<Vec<_>>(), vec!["core", "legacy"]);
        assert_eq!(core.private_include_directories().collect::<Vec<_>>(), vec!["src"]);
        assert_eq!(config.components[1].alias.as_deref(), Some("pins"));

        let variant = &config.variants[0];
        assert_eq!(
            variant.component_names().cloned().collect::<Vec<_>>(),
            vec!["arduino_core", "uno_pins"]
        );
        assert_eq!(variant.platforms["gtest"].components, vec!["test_utils"]);
        assert_eq!(variant.configs[0].id, "vars");
    }

    #[test]
    fn test_from_file_records_origin() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("yanga.yaml");
        std::fs::write(
            &path,
            "components:\n  - name: a\nplatforms:\n  - name: gtest\n",
        )
        .unwrap();

        let config = UserConfig::from_file(&path).unwrap();
        assert_eq!(config.file.as_deref(), Some(path.as_path()));
        assert_eq!(config.components[0].file.as_deref(), Some(path.as_path()));
        assert_eq!(config.platforms[0].file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_invalid_yaml_is_user_notification() {
        let err = UserConfig::from_str_named("components: [name: a", "broken.yaml").unwrap_err();
        let note = err.downcast_ref::<UserNotification>().unwrap();
        assert!(note.message().contains("broken.yaml"));
    }
}
