//! Implementation of `yanga filter-compile-commands`.
//!
//! Narrows a `compile_commands.json` down to the entries compiling one of
//! the given source files, so tools like clang-tidy only see a component.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::diagnostic::UserNotification;
use crate::util::fs::{absolutize, normalize_path, read_to_string, write_if_changed};

/// One entry of a compilation database.
///
/// Unknown keys are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileCommand {
    pub directory: PathBuf,
    pub file: PathBuf,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl CompileCommand {
    /// The compiled file, resolved against the entry's directory.
    pub fn file_path(&self) -> PathBuf {
        absolutize(&self.directory, &self.file)
    }
}

#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub compilation_database: PathBuf,
    pub source_files: Vec<PathBuf>,
    pub output_file: PathBuf,
}

/// Keep the entries whose file is one of `source_files`.
pub fn filter_commands(
    commands: Vec<CompileCommand>,
    source_files: &[PathBuf],
) -> Vec<CompileCommand> {
    let wanted: HashSet<PathBuf> = source_files.iter().map(|p| normalize_path(p)).collect();
    commands
        .into_iter()
        .filter(|c| wanted.contains(&c.file_path()))
        .collect()
}

/// Read, filter and write. Returns the number of entries kept.
pub fn filter_compile_commands(opts: &FilterOptions) -> Result<usize> {
    let commands = load_compilation_database(&opts.compilation_database)?;
    let total = commands.len();
    let filtered = filter_commands(commands, &opts.source_files);
    tracing::info!(
        "Kept {} of {} compile command(s) in {}",
        filtered.len(),
        total,
        opts.output_file.display()
    );

    let contents = serde_json::to_string_pretty(&filtered)
        .context("failed to serialize compile commands")?;
    write_if_changed(&opts.output_file, &contents)?;
    Ok(filtered.len())
}

fn load_compilation_database(path: &Path) -> Result<Vec<CompileCommand>> {
    if !path.is_file() {
        bail!(UserNotification::new(format!(
            "Compilation database '{}' does not exist.",
            path.display()
        )));
    }
    let contents = read_to_string(path)?;
    let commands = serde_json::from_str(&contents).map_err(|e| {
        UserNotification::new(format!(
            "Failed to parse compilation database '{}': {}",
            path.display(),
            e
        ))
    })?;
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn database(dir: &Path) -> String {
        format!(
            r#"[
  {{"directory": "{0}/build", "command": "gcc -c ../src/a.c", "file": "../src/a.c"}},
  {{"directory": "{0}/build", "arguments": ["gcc", "-c", "b.c"], "file": "{0}/src/b.c", "output": "b.o"}},
  {{"directory": "{0}/build", "command": "gcc -c ../src/c.c", "file": "../src/c.c"}}
]"#,
            dir.display()
        )
    }

    #[test]
    fn test_relative_and_absolute_entries_match() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("compile_commands.json");
        std::fs::write(&input, database(tmp.path())).unwrap();
        let output = tmp.path().join("out/CompA/compile_commands.json");

        let kept = filter_compile_commands(&FilterOptions {
            compilation_database: input,
            source_files: vec![tmp.path().join("src/a.c"), tmp.path().join("src/./b.c")],
            output_file: output.clone(),
        })
        .unwrap();
        assert_eq!(kept, 2);

        let written: Vec<CompileCommand> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        let files: Vec<_> = written.iter().map(|c| c.file_path()).collect();
        assert_eq!(files, vec![tmp.path().join("src/a.c"), tmp.path().join("src/b.c")]);
        // Extra keys survive
        assert_eq!(written[1].rest["output"], "b.o");
    }

    #[test]
    fn test_missing_database_is_user_notification() {
        let tmp = TempDir::new().unwrap();
        let err = filter_compile_commands(&FilterOptions {
            compilation_database: tmp.path().join("missing.json"),
            source_files: Vec::new(),
            output_file: tmp.path().join("out.json"),
        })
        .unwrap_err();
        assert!(err.downcast_ref::<UserNotification>().is_some());
    }
}
