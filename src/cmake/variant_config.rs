//! Variant configuration values exported as CMake variables.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::cmake::backend::{CMakeElement, CMakeVariable};
use crate::cmake::generator::{CMakeGenerator, GeneratorSetup};
use crate::core::config::ConfigFile;
use crate::pipeline::context::ExecutionContext;
use crate::util::diagnostic::UserNotification;
use crate::util::fs::read_to_string;

/// A config entry together with the file it was declared in.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredConfig<'a> {
    pub config: &'a ConfigFile,
    pub declared_in: Option<&'a Path>,
}

/// Configs in override order: variant, platform, variant-platform.
/// `id` restricts the result to one config id.
pub fn collect_configs<'a>(ctx: &'a ExecutionContext, id: Option<&str>) -> Vec<DeclaredConfig<'a>> {
    let mut result = Vec::new();
    let mut push = |configs: &'a [ConfigFile], declared_in: Option<&'a Path>| {
        result.extend(
            configs
                .iter()
                .filter(|c| id.map_or(true, |id| c.id == id))
                .map(|config| DeclaredConfig { config, declared_in }),
        );
    };

    if let Some(ref variant) = ctx.variant {
        push(&variant.configs, variant.file.as_deref());
    }
    if let Some(ref platform) = ctx.platform {
        push(&platform.configs, platform.file.as_deref());
        if let Some(variant) = ctx.variant.as_ref() {
            if let Some(vp) = variant.platforms.get(&platform.name) {
                push(&vp.configs, variant.file.as_deref());
            }
        }
    }
    result
}

impl DeclaredConfig<'_> {
    /// Inline `content`, or the YAML mapping stored in `file`
    /// (relative to the declaring file).
    pub fn load(&self) -> Result<Mapping> {
        if let Some(ref content) = self.config.content {
            return Ok(content.clone());
        }
        let Some(ref file) = self.config.file else {
            bail!(UserNotification::new(format!(
                "Config '{}' has neither file nor content.",
                self.config.id
            )));
        };
        let path = match self.declared_in.and_then(Path::parent) {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        };
        let text = read_to_string(&path)?;
        let mapping = serde_yaml::from_str(&text).map_err(|e| {
            UserNotification::new(format!(
                "Failed parsing config '{}' from '{}': {}",
                self.config.id,
                path.display(),
                e
            ))
        })?;
        Ok(mapping)
    }
}

/// Render a YAML value the way CMake expects it.
fn cmake_value(key: &str, value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null => "\"\"".to_string(),
        Value::Bool(true) => "ON".to_string(),
        Value::Bool(false) => "OFF".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.is_empty() || s.contains(char::is_whitespace) => format!("\"{}\"", s),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => {
            let items = items
                .iter()
                .map(|i| cmake_value(key, i).map(|v| v.trim_matches('"').to_string()))
                .collect::<Result<Vec<_>>>()?;
            format!("\"{}\"", items.join(";"))
        }
        Value::Tagged(tagged) => cmake_value(key, &tagged.value)?,
        Value::Mapping(_) => bail!(UserNotification::new(format!(
            "Config value '{}' is a mapping and cannot be exported as a CMake variable.",
            key
        ))),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigCMakeGeneratorConfig {
    /// Only export configs with this id
    pub id: Option<String>,
}

pub fn config_generator<'a>(setup: GeneratorSetup<'a>) -> Result<Box<dyn CMakeGenerator + 'a>> {
    let config: ConfigCMakeGeneratorConfig = setup.parse_config()?;
    Ok(Box::new(ConfigCMakeGenerator {
        ctx: setup.context,
        id: config.id,
    }))
}

/// Emits `set(KEY VALUE)` for every configured key/value pair.
pub struct ConfigCMakeGenerator<'a> {
    ctx: &'a ExecutionContext,
    id: Option<String>,
}

impl<'a> ConfigCMakeGenerator<'a> {
    pub fn new(ctx: &'a ExecutionContext, id: Option<String>) -> Self {
        ConfigCMakeGenerator { ctx, id }
    }
}

impl CMakeGenerator for ConfigCMakeGenerator<'_> {
    fn generate(&self) -> Result<Vec<CMakeElement>> {
        let mut elements = Vec::new();
        for declared in collect_configs(self.ctx, self.id.as_deref()) {
            elements.push(CMakeElement::Comment(format!("Config '{}'", declared.config.id)));
            for (key, value) in declared.load()? {
                let Some(key) = key.as_str() else {
                    bail!(UserNotification::new(format!(
                        "Config '{}' has a non-string key.",
                        declared.config.id
                    )));
                };
                let value = cmake_value(key, &value)?;
                elements.push(CMakeElement::Variable(CMakeVariable::new(key, value)));
            }
        }
        Ok(elements)
    }
}
