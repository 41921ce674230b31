//! Integration tests for the apibump CLI
//!
//! Runs the built binary against directory snapshots in tempfile
//! directories, so no git repository is needed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Run apibump with the given args in the specified directory
fn run_apibump(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apibump"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute apibump command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_file(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, content).expect("Failed to write file");
}

/// Two versions of a small package under `old/` and `new/`.
fn setup_versions(dir: &Path, old: &str, new: &str) {
    write_file(dir, "old/pkg/api.py", old);
    write_file(dir, "new/pkg/api.py", new);
}

fn decide(dir: &Path, extra: &[&str]) -> Output {
    let mut args = vec!["decide", "--source", "dir", "--base", "old", "--head", "new"];
    args.extend_from_slice(extra);
    run_apibump(dir, &args)
}

// ============================================================================
// decide
// ============================================================================

#[test]
fn test_decide_json_major() {
    let dir = TempDir::new().unwrap();
    setup_versions(
        dir.path(),
        "def greet(name):\n    pass\n",
        "def greet(name, force):\n    pass\n",
    );

    let output = decide(dir.path(), &["--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["level"], "major");
    assert_eq!(value["confidence"], 1.0);
    assert_eq!(value["reasons"][0], "Added required param 'force'");
    assert_eq!(value["impacts"][0]["severity"], "major");
    assert_eq!(value["impacts"][0]["symbol"], "pkg.api:greet");
}

#[test]
fn test_decide_markdown_minor() {
    let dir = TempDir::new().unwrap();
    setup_versions(
        dir.path(),
        "def greet(name):\n    pass\n",
        "def greet(name):\n    pass\n\ndef wave():\n    pass\n",
    );

    let output = decide(dir.path(), &["--format", "md"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.starts_with("**apibump** suggests: `minor`"));
    assert!(text.contains("- **minor** `pkg.api:wave`: Added public symbol"));
}

#[test]
fn test_decide_no_changes() {
    let dir = TempDir::new().unwrap();
    let source = "def greet(name):\n    pass\n";
    setup_versions(dir.path(), source, source);

    let output = decide(dir.path(), &["--format", "text"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Suggested bump: NONE"));
    assert!(text.contains("no API-impacting changes detected"));
}

#[test]
fn test_decide_reports_diagnostics_on_stderr() {
    let dir = TempDir::new().unwrap();
    setup_versions(
        dir.path(),
        "def greet(name):\n    pass\n",
        "def greet(name):\n    pass\n",
    );
    write_file(dir.path(), "new/pkg/broken.py", "def broken(:\n");

    let output = decide(dir.path(), &["--format", "json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["level"], "none");
    assert!(stderr(&output).contains("pkg/broken.py:1"));
}

#[test]
fn test_config_overrides_and_ignores() {
    let dir = TempDir::new().unwrap();
    setup_versions(
        dir.path(),
        "def greet(name):\n    pass\n",
        "def greet(name, loud=False):\n    pass\n",
    );
    write_file(dir.path(), "new/tests/test_api.py", "def test_new():\n    pass\n");
    write_file(
        dir.path(),
        "apibump.toml",
        r#"
[ignore]
paths = ["tests/**"]

[rules.overrides]
"param-added-optional" = "patch"
"#,
    );

    let output = decide(dir.path(), &["--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["level"], "patch");
    assert_eq!(value["impacts"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_width_wraps_impact_table() {
    let dir = TempDir::new().unwrap();
    setup_versions(
        dir.path(),
        "def greet(name):\n    pass\n",
        "def greet(name, a_rather_long_parameter_name):\n    pass\n",
    );
    write_file(dir.path(), "apibump.toml", "[output]\nwidth = 40\n");

    let output = decide(dir.path(), &["--format", "text"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    let table: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with(['╭', '│', '├', '╰']))
        .collect();
    assert!(!table.is_empty());
    assert!(table.iter().all(|l| l.chars().count() <= 40), "{}", text);
}

#[test]
fn test_web_routes_enabled_by_flag() {
    let dir = TempDir::new().unwrap();
    setup_versions(
        dir.path(),
        "@app.route(\"/users\")\ndef _users():\n    pass\n",
        "@app.route(\"/users\", methods=[\"POST\"])\ndef _users():\n    pass\n",
    );

    let output = decide(dir.path(), &["--format", "json", "--enable", "web_routes"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["level"], "major");
    assert_eq!(value["impacts"][0]["symbol"], "GET /users");
    assert_eq!(value["impacts"][0]["reason"], "Removed route");
    assert_eq!(value["impacts"][1]["symbol"], "POST /users");
}

#[test]
fn test_unknown_analyser_fails() {
    let dir = TempDir::new().unwrap();
    setup_versions(dir.path(), "", "");

    let output = decide(dir.path(), &["--enable", "graphql"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("graphql"));
}

#[test]
fn test_strict_rejects_malformed_config() {
    let dir = TempDir::new().unwrap();
    setup_versions(dir.path(), "", "");
    write_file(dir.path(), "apibump.toml", "[rules\n");

    let lenient = decide(dir.path(), &["--format", "json"]);
    assert!(lenient.status.success());

    let strict = decide(dir.path(), &["--format", "json", "--strict"]);
    assert!(!strict.status.success());
    assert!(stderr(&strict).contains("apibump.toml"));
}

// ============================================================================
// analysers
// ============================================================================

#[test]
fn test_analysers_lists_builtin_domains() {
    let dir = TempDir::new().unwrap();

    let output = run_apibump(dir.path(), &["analysers", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = value["analysers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["cli", "migrations", "openapi", "signatures", "web_routes"]);
    assert_eq!(value["analysers"][3]["enabled"], true);
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = run_apibump(dir.path(), &["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("decide"));
}
