//! CLI integration tests for Yanga.
//!
//! These tests drive the `yanga` binary against throwaway projects.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the yanga binary command.
fn yanga() -> Command {
    Command::cargo_bin("yanga").unwrap()
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const PROJECT: &str = "\
pipeline:
  install:
    - step: InstallTools
      config:
        install_dirs: [tools/bin]
components:
  - name: CompA
    path: src/comp_a
    sources: [comp_a.c]
variants:
  - name: Blue
    components: [CompA]
  - name: Red
    components: [CompA]
";

fn write_project(dir: &Path) {
    fs::write(dir.join("yanga.yaml"), PROJECT).unwrap();
}

// ============================================================================
// yanga run
// ============================================================================

#[test]
fn test_run_without_configuration_fails() {
    let tmp = temp_dir();

    yanga()
        .args(["run", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No 'yanga.yaml' configuration file found"));
}

#[test]
fn test_run_print_lists_variants() {
    let tmp = temp_dir();
    write_project(tmp.path());

    yanga()
        .args(["run", "--print", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Found 2 variant(s)"))
        .stderr(predicate::str::contains("- Blue"));
}

#[test]
fn test_run_requires_variant_choice() {
    let tmp = temp_dir();
    write_project(tmp.path());

    yanga()
        .args(["run", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Multiple variants found (Blue, Red)"))
        .stderr(predicate::str::contains("--variant-name"));
}

#[test]
fn test_run_records_fingerprint() {
    let tmp = temp_dir();
    write_project(tmp.path());

    yanga()
        .args(["run", "--variant-name", "Blue", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .success();

    let deps = tmp.path().join("build/Blue/install/InstallTools.deps.json");
    assert!(deps.exists());
    let info =
        fs::read_to_string(tmp.path().join("build/Blue/install/install_tools_exec_info.json"))
            .unwrap();
    assert!(info.contains("tools/bin"));
}

#[test]
fn test_run_unknown_step_fails() {
    let tmp = temp_dir();
    write_project(tmp.path());

    yanga()
        .args(["run", "--variant-name", "Blue", "--step", "Deploy", "--project-dir"])
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Step 'Deploy' not found"));

    assert!(!tmp.path().join("build").exists());
}

// ============================================================================
// yanga filter-compile-commands
// ============================================================================

#[test]
fn test_filter_compile_commands() {
    let tmp = temp_dir();
    let dir = tmp.path().display().to_string();
    let database = format!(
        r#"[
  {{"directory": "{0}/build", "command": "gcc -c ../src/a.c", "file": "../src/a.c"}},
  {{"directory": "{0}/build", "command": "gcc -c ../src/b.c", "file": "../src/b.c"}}
]"#,
        dir
    );
    fs::write(tmp.path().join("compile_commands.json"), database).unwrap();

    yanga()
        .current_dir(tmp.path())
        .args([
            "filter-compile-commands",
            "--compilation-database",
            "compile_commands.json",
            "--source-file",
            "src/b.c",
            "--output-file",
            "out/compile_commands.json",
        ])
        .assert()
        .success();

    let filtered = fs::read_to_string(tmp.path().join("out/compile_commands.json")).unwrap();
    assert!(filtered.contains("../src/b.c"));
    assert!(!filtered.contains("../src/a.c"));
}

// ============================================================================
// yanga targets-doc
// ============================================================================

#[test]
fn test_targets_doc() {
    let tmp = temp_dir();
    fs::write(
        tmp.path().join("targets_data.json"),
        r#"{"targets": [
  {"name": "build", "depends": ["CompA_build"], "outputs": [], "target_type": "CUSTOM_TARGET"},
  {"name": "CompA_build", "depends": [], "outputs": [], "target_type": "CUSTOM_TARGET"}
]}"#,
    )
    .unwrap();

    yanga()
        .current_dir(tmp.path())
        .args([
            "targets-doc",
            "--targets-data-file",
            "targets_data.json",
            "--output-file",
            "doc/targets.md",
            "--target",
            "build",
        ])
        .assert()
        .success();

    let doc = fs::read_to_string(tmp.path().join("doc/targets.md")).unwrap();
    assert!(doc.contains("### build"));
    assert!(doc.contains("- `CompA_build`"));
}

#[test]
fn test_targets_doc_missing_data_file() {
    let tmp = temp_dir();

    yanga()
        .current_dir(tmp.path())
        .args(["targets-doc", "--targets-data-file", "missing.json", "--output-file", "out.md"])
        .assert()
        .failure();
}

// ============================================================================
// yanga report-config
// ============================================================================

#[test]
fn test_report_config_component_scope() {
    let tmp = temp_dir();
    let output = tmp.path().join("report_config.json");

    yanga()
        .args([
            "report-config",
            "--scope",
            "component",
            "--variant-name",
            "Blue",
            "--component-name",
            "CompA",
            "--source-file",
            "src/a.c",
            "--output-file",
        ])
        .arg(&output)
        .assert()
        .success();

    let json = fs::read_to_string(output).unwrap();
    assert!(json.contains("\"scope\": \"component\""));
    assert!(json.contains("\"component_name\": \"CompA\""));
}

#[test]
fn test_report_config_component_scope_needs_name() {
    let tmp = temp_dir();

    yanga()
        .args(["report-config", "--scope", "component", "--variant-name", "Blue", "--output-file"])
        .arg(tmp.path().join("report_config.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("component name is required"));
}

// ============================================================================
// yanga fix-html-links
// ============================================================================

#[test]
fn test_fix_html_links() {
    let tmp = temp_dir();
    let page_dir = tmp.path().join("components/CompA");
    fs::create_dir_all(&page_dir).unwrap();
    fs::write(page_dir.join("index.html"), r#"<a href="./variant/report.html#http://">"#).unwrap();

    yanga().arg("fix-html-links").arg(tmp.path()).assert().success();

    assert_eq!(
        fs::read_to_string(page_dir.join("index.html")).unwrap(),
        r#"<a href="../../variant/report.html">"#
    );
}

#[test]
fn test_fix_html_links_missing_dir() {
    let tmp = temp_dir();

    yanga()
        .arg("fix-html-links")
        .arg(tmp.path().join("missing"))
        .assert()
        .code(1);
}

// ============================================================================
// yanga completions
// ============================================================================

#[test]
fn test_completions_bash() {
    yanga()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("yanga"));
}
