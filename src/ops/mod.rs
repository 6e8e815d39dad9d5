//! High-level operations.
//!
//! This module contains the implementation of the yanga commands.

pub mod filter_compile_commands;
pub mod fix_html_links;
pub mod report_config;
pub mod targets_doc;
pub mod yanga_run;

pub use filter_compile_commands::{filter_compile_commands, FilterOptions};
pub use fix_html_links::{fix_html_links, FixHtmlLinksSummary};
pub use report_config::{ReportConfig, ReportScope};
pub use targets_doc::{targets_doc, TargetsDocOptions};
pub use yanga_run::{run, RunOptions};
