//! Built-in pipeline steps.

pub mod execute_build;
pub mod install_tools;
pub mod script;

use anyhow::Result;
use serde::de::DeserializeOwned;

use crate::core::config::StepConfig;
use crate::util::diagnostic::UserNotification;

/// Deserialize a step's `config` block; absent means default.
pub(crate) fn parse_step_config<T: DeserializeOwned + Default>(config: &StepConfig) -> Result<T> {
    let Some(ref mapping) = config.config else {
        return Ok(T::default());
    };
    let parsed = serde_yaml::from_value(serde_yaml::Value::Mapping(mapping.clone())).map_err(|e| {
        UserNotification::new(format!("Invalid configuration for step '{}': {}", config.step, e))
    })?;
    Ok(parsed)
}
