//! Integration tests for the exprkit CLI

use std::fs;
use std::process::{Command, Output};

/// Path to the compiled binary
fn get_binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_exprkit")
}

fn run(args: &[&str]) -> Output {
    Command::new(get_binary_path())
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute exprkit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_eval_basic() {
    let output = run(&["eval", "min(200, 150)"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "150");
}

#[test]
fn test_eval_string_is_quoted() {
    let output = run(&["eval", r#"sprintf("%s: %d", "count", 100)"#]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), r#""count: 100""#);
}

#[test]
fn test_eval_with_set_binding() {
    let output = run(&["eval", "--set", "self=:8080", "split_addr().port"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "8080");
}

#[test]
fn test_eval_with_expression_binding() {
    let output = run(&["eval", "--bind", "limit=1 << 10", "limit * 2"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "2048");
}

#[test]
fn test_eval_with_vars_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let vars = dir.path().join("vars.json");
    fs::write(&vars, r#"{"ID": "123e4567-e89b-12d3-a456-426614174000"}"#)
        .expect("Failed to write vars file");

    let output = run(&[
        "eval",
        "--vars",
        vars.to_str().expect("utf-8 path"),
        "len(ID) == 36",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "true");
}

#[test]
fn test_eval_json_output() {
    let output = run(&["eval", "--format", "json", r#"split_addr("localhost:80")"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("output should be JSON");
    assert_eq!(json["Host"], "localhost");
    assert_eq!(json["Port"], 80);
}

#[test]
fn test_eval_yaml_output() {
    let output = run(&["eval", "--format", "yaml", r#"split("a,b", ",")"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(&stdout(&output)).expect("output should be YAML");
    assert_eq!(yaml[0], serde_yaml::Value::from("a"));
    assert_eq!(yaml[1], serde_yaml::Value::from("b"));
}

#[test]
fn test_eval_test_mode_pins_now() {
    let output = run(&["--test-mode", "eval", r#"now() + duration("-1m")"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "2019-12-31T23:59:00Z");
}

#[test]
fn test_eval_reports_parse_error() {
    let output = run(&["eval", "1 +"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Parse error"), "stderr: {}", stderr(&output));
}

#[test]
fn test_eval_reports_undefined_name() {
    let output = run(&["eval", "missing + 1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("undefined: missing"));
}

#[test]
fn test_check_passes_and_fails() {
    let pass = run(&["check", "--set", "self=:8080", "split_addr().port > 1024"]);
    assert!(pass.status.success(), "stderr: {}", stderr(&pass));

    let fail = run(&["check", "--set", "self=:80", "split_addr().port > 1024"]);
    assert!(!fail.status.success());

    let not_bool = run(&["check", "1 + 1"]);
    assert!(!not_bool.status.success());
    assert!(stderr(&not_bool).contains("expected bool"));
}

#[test]
fn test_parse_prints_ast() {
    let output = run(&["parse", "--format", "json", "a.b(1)"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("output should be JSON");
    assert!(json.get("Call").is_some(), "unexpected AST: {}", json);
}

#[test]
fn test_functions_lists_builtins_and_packages() {
    let output = run(&["functions"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("split_addr(string)"));
    assert!(out.contains("math.Round(float64)"));
    assert!(out.contains("time.Minute"));
}

#[test]
fn test_invalid_binding_is_rejected() {
    let output = run(&["eval", "--set", "no-equals-sign", "1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid binding"));
}
