//! Implementation of `yanga fix-html-links`.
//!
//! Sphinx emits links like `href="./some/page.html#http://"` for pages of
//! a nested report. They are rewritten to `href="../some/page.html"` with
//! one `../` per directory level of the containing file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use crate::util::diagnostic::UserNotification;

const BUGGY_LINK_PATTERN: &str = r#"href="(\./[^"]*\.html)#http://""#;

/// Outcome of one file.
#[derive(Debug)]
struct FileFixResult {
    path: PathBuf,
    fixes: usize,
    error: Option<String>,
}

/// Totals over a whole report directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixHtmlLinksSummary {
    pub processed_files: usize,
    pub fixed_files: usize,
    pub fixed_links: usize,
    pub errors: Vec<String>,
}

/// Rewrite the buggy links of one document found `depth` directories
/// below the report root.
pub fn fix_links(pattern: &Regex, content: &str, depth: usize) -> (String, usize) {
    let prefix = "../".repeat(depth);
    let mut count = 0;
    let fixed = pattern.replace_all(content, |caps: &regex::Captures<'_>| {
        count += 1;
        format!("href=\"{}{}\"", prefix, &caps[1][2..])
    });
    (fixed.into_owned(), count)
}

fn fix_file(pattern: &Regex, report_dir: &Path, path: &Path) -> FileFixResult {
    let result = |fixes, error| FileFixResult {
        path: path.to_path_buf(),
        fixes,
        error,
    };
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return result(0, Some(format!("Error reading {}: {}", path.display(), e))),
    };
    let depth = path
        .strip_prefix(report_dir)
        .map(|rel| rel.components().count().saturating_sub(1))
        .unwrap_or(0);

    let (fixed, fixes) = fix_links(pattern, &content, depth);
    if fixes == 0 {
        return result(0, None);
    }
    if let Err(e) = std::fs::write(path, fixed) {
        return result(fixes, Some(format!("Error writing {}: {}", path.display(), e)));
    }
    result(fixes, None)
}

/// Fix every `.html` file below `report_dir`, in parallel.
///
/// Per-file failures are collected in the summary, not raised.
pub fn fix_html_links(report_dir: &Path) -> Result<FixHtmlLinksSummary> {
    if !report_dir.is_dir() {
        bail!(UserNotification::new(format!(
            "Report root directory does not exist: {}",
            report_dir.display()
        )));
    }
    let pattern = Regex::new(BUGGY_LINK_PATTERN).context("invalid link pattern")?;

    let html_files: Vec<PathBuf> = WalkDir::new(report_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "html")
        })
        .map(|e| e.into_path())
        .collect();

    let results: Vec<FileFixResult> = html_files
        .par_iter()
        .map(|path| fix_file(&pattern, report_dir, path))
        .collect();

    let mut summary = FixHtmlLinksSummary {
        processed_files: results.len(),
        ..Default::default()
    };
    for result in results {
        match result.error {
            Some(error) => {
                tracing::debug!("{}", error);
                summary.errors.push(error);
            }
            None if result.fixes > 0 => {
                tracing::debug!("Fixed {} links in {}", result.fixes, result.path.display());
                summary.fixed_files += 1;
                summary.fixed_links += result.fixes;
            }
            None => {}
        }
    }

    tracing::info!("Processed {} HTML files", summary.processed_files);
    tracing::info!("Fixed {} links in {} files", summary.fixed_links, summary.fixed_files);
    if !summary.errors.is_empty() {
        tracing::warn!("Encountered {} errors during processing", summary.errors.len());
    }
    Ok(summary)
}
