//! `yanga fix-html-links` command

use anyhow::{bail, Result};

use crate::cli::FixHtmlLinksArgs;
use yanga::ops::fix_html_links::fix_html_links;
use yanga::util::diagnostic::UserNotification;

pub fn execute(args: FixHtmlLinksArgs) -> Result<()> {
    let summary = fix_html_links(&args.report_dir)?;
    if !summary.errors.is_empty() {
        bail!(UserNotification::new(format!(
            "Failed to fix {} file(s) in {}:\n{}",
            summary.errors.len(),
            args.report_dir.display(),
            summary.errors.join("\n")
        )));
    }
    Ok(())
}
