//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use yanga::ops::ReportScope;

/// Yanga - pipeline-driven builds for multi-variant C/C++ projects
#[derive(Parser)]
#[command(name = "yanga")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline for a variant and platform
    Run(RunArgs),

    /// Keep only the compile commands of the given sources
    FilterCompileCommands(FilterCompileCommandsArgs),

    /// Render the dependency documentation of build targets
    TargetsDoc(TargetsDocArgs),

    /// Write a report configuration for a component or variant
    ReportConfig(ReportConfigArgs),

    /// Fix buggy links in Sphinx-generated HTML reports
    FixHtmlLinks(FixHtmlLinksArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Project root directory
    #[arg(long, default_value = ".", env = "YANGA_PROJECT_DIR")]
    pub project_dir: PathBuf,

    /// Platform to build for
    #[arg(long)]
    pub platform: Option<String>,

    /// Variant to build
    #[arg(long)]
    pub variant_name: Option<String>,

    /// Restrict the build to one component
    #[arg(long)]
    pub component_name: Option<String>,

    /// Build target, e.g. all, build, test, coverage
    #[arg(long)]
    pub target: Option<String>,

    /// Run the pipeline up to and including this step
    #[arg(long)]
    pub step: Option<String>,

    /// Only run the step given with --step
    #[arg(long)]
    pub single: bool,

    /// Print the project information and exit
    #[arg(long)]
    pub print: bool,

    /// Run every step even if it is up to date
    #[arg(long)]
    pub force_run: bool,
}

#[derive(Args)]
pub struct FilterCompileCommandsArgs {
    /// Input compile_commands.json
    #[arg(long)]
    pub compilation_database: PathBuf,

    /// Source file to keep; may be given multiple times
    #[arg(long = "source-file", alias = "source-files", num_args = 1..)]
    pub source_files: Vec<PathBuf>,

    /// Output compile_commands.json
    #[arg(long)]
    pub output_file: PathBuf,
}

#[derive(Args)]
pub struct TargetsDocArgs {
    /// targets_data.json written by the build-system generation
    #[arg(long)]
    pub targets_data_file: PathBuf,

    /// Output markdown file
    #[arg(long)]
    pub output_file: PathBuf,

    /// Targets to document (defaults to all custom targets)
    #[arg(long = "target", num_args = 1..)]
    pub targets: Vec<String>,
}

#[derive(Args)]
pub struct ReportConfigArgs {
    #[arg(long, value_enum)]
    pub scope: ReportScope,

    #[arg(long)]
    pub variant_name: String,

    /// Required for the component scope
    #[arg(long)]
    pub component_name: Option<String>,

    /// Report relevant source file; may be given multiple times
    #[arg(long = "source-file", alias = "source-files", num_args = 1..)]
    pub source_files: Vec<PathBuf>,

    /// Where to write report_config.json
    #[arg(long)]
    pub output_file: PathBuf,
}

#[derive(Args)]
pub struct FixHtmlLinksArgs {
    /// Root directory of the HTML report
    pub report_dir: PathBuf,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
