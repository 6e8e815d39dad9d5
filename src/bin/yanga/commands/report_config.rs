//! `yanga report-config` command

use anyhow::Result;

use crate::cli::ReportConfigArgs;
use yanga::ops::report_config::ReportConfig;

pub fn execute(args: ReportConfigArgs) -> Result<()> {
    let config = ReportConfig {
        scope: args.scope,
        variant_name: args.variant_name,
        component_name: args.component_name,
        source_files: args.source_files,
    };
    config.to_file(&args.output_file)?;
    Ok(())
}
