//! Command implementations

pub mod completions;
pub mod filter_compile_commands;
pub mod fix_html_links;
pub mod report_config;
pub mod run;
pub mod targets_doc;
