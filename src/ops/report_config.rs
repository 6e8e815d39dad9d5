//! Implementation of `yanga report-config`.
//!
//! Writes the `report_config.json` consumed by report generation: which
//! variant or component is reported on and which sources are relevant.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::diagnostic::UserNotification;
use crate::util::fs::write_if_changed;

/// What a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportScope {
    Component,
    Variant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub scope: ReportScope,
    pub variant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    pub source_files: Vec<PathBuf>,
}

impl ReportConfig {
    /// A component report requires a component name.
    pub fn validate(&self) -> Result<()> {
        if self.scope == ReportScope::Component && self.component_name.is_none() {
            bail!(UserNotification::new(
                "A component name is required for a component scope report."
            ));
        }
        Ok(())
    }

    /// Write the configuration; untouched when nothing changed.
    pub fn to_file(&self, output_file: &Path) -> Result<bool> {
        self.validate()?;
        let contents =
            serde_json::to_string_pretty(self).context("failed to serialize report config")?;
        let written = write_if_changed(output_file, &contents)?;
        tracing::info!("Report configuration written to {}", output_file.display());
        Ok(written)
    }
}
