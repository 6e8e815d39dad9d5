//! `yanga targets-doc` command

use anyhow::Result;

use crate::cli::TargetsDocArgs;
use yanga::ops::targets_doc::{targets_doc, TargetsDocOptions};

pub fn execute(args: TargetsDocArgs) -> Result<()> {
    targets_doc(&TargetsDocOptions {
        targets_data_file: args.targets_data_file,
        output_file: args.output_file,
        targets: args.targets,
    })
}
