//! Implementation of `yanga targets-doc`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::targets::{TargetGraph, TargetType, TargetsData};
use crate::util::fs::write_if_changed;

#[derive(Debug, Clone)]
pub struct TargetsDocOptions {
    pub targets_data_file: PathBuf,
    pub output_file: PathBuf,
    /// Targets to document; all custom targets when empty
    pub targets: Vec<String>,
}

/// Render the dependency documentation of the requested targets.
pub fn render_targets_doc(data: &TargetsData, targets: &[String]) -> String {
    let names: Vec<String> = if targets.is_empty() {
        data.targets
            .iter()
            .filter(|t| t.target_type == TargetType::CustomTarget)
            .map(|t| t.name.clone())
            .collect()
    } else {
        targets.to_vec()
    };
    TargetGraph::new(data).render_markdown(&names)
}

pub fn targets_doc(opts: &TargetsDocOptions) -> Result<()> {
    let data = TargetsData::from_json_file(&opts.targets_data_file)?;
    let doc = render_targets_doc(&data, &opts.targets);
    write_if_changed(&opts.output_file, &doc)?;
    tracing::info!("Targets documentation written to {}", opts.output_file.display());
    Ok(())
}
