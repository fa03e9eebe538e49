//! Integration tests for the `msie` binary
//!
//! Each test runs the built executable with colors off and checks its
//! exit status and output.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn msie(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_msie"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to launch msie")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn path(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ────────────────────────────────────────────────────────────────────────────
// eval
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_eval_in_every_mode() {
    for mode in ["auto", "ie", "edge", "activescript"] {
        let output = msie(&["--mode", mode, "eval", "7 * 8 - 20"]);
        assert!(output.status.success(), "mode {}", mode);
        assert_eq!(stdout(&output), "36", "mode {}", mode);
    }
}

#[test]
fn test_eval_json() {
    let output = msie(&["--json", "eval", "'Hello, ' + 'World!'"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["type"], "string");
    assert_eq!(value["value"], "Hello, World!");
}

#[test]
fn test_eval_error_exit_status() {
    let output = msie(&["eval", "throw new Error('broken')"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken"));
}

#[test]
fn test_eval_error_json() {
    let output = msie(&["--json", "eval", "var = ;"]);
    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["error"]["category"], "compile");
}

#[test]
fn test_unknown_mode_rejected() {
    let output = msie(&["--mode", "v8", "eval", "1"]);
    assert!(!output.status.success());
}

// ────────────────────────────────────────────────────────────────────────────
// run and precompile
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_file() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("ok.js");
    fs::write(&script, "var price = 2.20; price -= 0.03;").unwrap();
    assert!(msie(&["run", path(&script)]).status.success());

    let failing = dir.path().join("fail.js");
    fs::write(&failing, "undefinedFunction();").unwrap();
    assert!(!msie(&["run", path(&failing)]).status.success());
}

#[test]
fn test_precompile_then_run() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("lib.js");
    let buffer = dir.path().join("lib.bin");
    fs::write(&script, "function add(a, b) { return a + b; } add(7, 9);").unwrap();

    let compiled = msie(&["--mode", "ie", "precompile", path(&script), "-o", path(&buffer)]);
    assert!(compiled.status.success());
    assert!(buffer.exists());

    let ran = msie(&["--mode", "ie", "run-precompiled", path(&script), path(&buffer)]);
    assert!(ran.status.success());
}

#[test]
fn test_precompile_not_supported_by_activescript() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("lib.js");
    fs::write(&script, "var x = 1;").unwrap();
    let output = msie(&[
        "--mode",
        "activescript",
        "precompile",
        path(&script),
        "-o",
        path(&dir.path().join("lib.bin")),
    ]);
    assert!(!output.status.success());
}

// ────────────────────────────────────────────────────────────────────────────
// settings
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = dir.path().join("msie.toml");
    fs::write(
        &settings,
        "engine_mode = \"chakra-edge-jsrt\"\n\n[runtime]\ndisable_eval = true\n",
    )
    .unwrap();

    let output = msie(&["--settings", path(&settings), "eval", "eval('1')"]);
    assert!(!output.status.success());

    // The command-line mode wins over the file's mode, the rest still applies.
    let output = msie(&["--settings", path(&settings), "--mode", "ie", "eval", "2 + 2"]);
    assert_eq!(stdout(&output), "4");
}

#[test]
fn test_missing_settings_file() {
    let output = msie(&["--settings", "/nonexistent/msie.toml", "eval", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("settings"));
}
