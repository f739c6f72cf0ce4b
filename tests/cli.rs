//! End-to-end tests of the `exprkit` binary.

mod common;

use std::ffi::OsStr;

use common::{NESTED_RULES, run_exprkit, write_document};

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

#[test]
fn test_expand_command() {
    let document = write_document(NESTED_RULES);
    let output = run_exprkit(&[OsStr::new("expand"), document.path().as_os_str()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "|p: Person| (((p.age != null) && (p.age >= 18)) && p.active)"
    );
}

#[test]
fn test_negate_command() {
    let document = write_document(NESTED_RULES);
    let output = run_exprkit(&[OsStr::new("negate"), document.path().as_os_str()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "|p: Person| (((p.age == null) || (p.age < 18)) || (p.active == false))"
    );
}

#[test]
fn test_eval_command() {
    let document = write_document(NESTED_RULES);
    let output = run_exprkit(&[
        OsStr::new("eval"),
        document.path().as_os_str(),
        OsStr::new("--arg"),
        OsStr::new(r#"{ "object": "Person", "fields": { "age": 20, "active": true } }"#),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "true");
}

#[test]
fn test_check_reports_errors() {
    let document = write_document(
        r#"{
            "predicate": {
                "kind": "lambda",
                "params": [{ "name": "p", "type": "Person" }],
                "body": { "kind": "param", "name": "q" }
            }
        }"#,
    );
    let output = run_exprkit(&[OsStr::new("check"), document.path().as_os_str()]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr(&output), "ERROR [lower]: unbound parameter `q`");
}

#[test]
fn test_check_accepts_valid_document() {
    let document = write_document(NESTED_RULES);
    let output = run_exprkit(&[OsStr::new("check"), document.path().as_os_str()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "✓ No errors");
}

#[test]
fn test_check_accepts_projection() {
    let document = write_document(
        r#"{
            "predicate": {
                "kind": "lambda",
                "params": [{ "name": "p", "type": "Person" }],
                "body": { "kind": "member", "target": { "kind": "param", "name": "p" }, "name": "name", "type": "string" }
            }
        }"#,
    );
    let output = run_exprkit(&[OsStr::new("check"), document.path().as_os_str()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "✓ No errors");
    assert_eq!(stderr(&output), "INFO [expand]: no expandable calls");
}

#[test]
fn test_missing_file() {
    let output = run_exprkit(&[OsStr::new("expand"), OsStr::new("/nonexistent/rules.json")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Error reading /nonexistent/rules.json"));
}
