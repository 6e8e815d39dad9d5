//! `yanga filter-compile-commands` command

use anyhow::Result;

use crate::cli::FilterCompileCommandsArgs;
use yanga::ops::filter_compile_commands::{filter_compile_commands, FilterOptions};
use yanga::util::fs::absolutize;

pub fn execute(args: FilterCompileCommandsArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let opts = FilterOptions {
        compilation_database: absolutize(&cwd, &args.compilation_database),
        source_files: args.source_files.iter().map(|f| absolutize(&cwd, f)).collect(),
        output_file: absolutize(&cwd, &args.output_file),
    };
    filter_compile_commands(&opts)?;
    Ok(())
}
