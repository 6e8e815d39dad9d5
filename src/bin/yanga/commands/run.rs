//! `yanga run` command

use anyhow::Result;

use crate::cli::RunArgs;
use yanga::ops::yanga_run::{run, RunOptions};
use yanga::util::fs::absolutize;

pub fn execute(args: RunArgs, verbose: bool) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let opts = RunOptions {
        project_dir: absolutize(&cwd, &args.project_dir),
        platform: args.platform,
        variant_name: args.variant_name,
        component_name: args.component_name,
        target: args.target,
        step: args.step,
        single: args.single,
        print: args.print,
        force_run: args.force_run,
        verbose,
    };

    let outcomes = run(&opts)?;
    for (step, outcome) in &outcomes {
        tracing::debug!("{}: {:?}", step, outcome);
    }
    Ok(())
}
