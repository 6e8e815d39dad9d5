//! Yanga CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use yanga::util::diagnostic::{emit, find_user_notification};

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Exit code for anything that is not a user notification.
const INTERNAL_ERROR_EXIT_CODE: i32 = 101;

fn main() {
    if let Err(e) = run() {
        match find_user_notification(&e) {
            Some(notification) => {
                emit(&notification.to_diagnostic(), use_color());
                std::process::exit(1);
            }
            None => {
                eprintln!("internal error: {:?}", e);
                std::process::exit(INTERNAL_ERROR_EXIT_CODE);
            }
        }
    }
}

fn use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "yanga=debug" } else { "yanga=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, cli.verbose),
        Commands::FilterCompileCommands(args) => commands::filter_compile_commands::execute(args),
        Commands::TargetsDoc(args) => commands::targets_doc::execute(args),
        Commands::ReportConfig(args) => commands::report_config::execute(args),
        Commands::FixHtmlLinks(args) => commands::fix_html_links::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
