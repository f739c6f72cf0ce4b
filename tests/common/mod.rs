//! Common test utilities for CLI and pipeline tests.

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

/// `Rules::is_adult(p)` over a `Person` parameter, with `Rules::is_adult`
/// itself delegating to `Rules::has_age`.
#[allow(dead_code)]
pub const NESTED_RULES: &str = r#"{
    "statics": {
        "Rules": {
            "has_age": {
                "kind": "lambda",
                "params": [{ "name": "z", "type": "Person" }],
                "body": {
                    "kind": "binary", "op": "ne",
                    "lhs": { "kind": "member", "target": { "kind": "param", "name": "z" }, "name": "age", "type": "int" },
                    "rhs": { "kind": "literal", "value": null, "type": "int" }
                }
            },
            "is_adult": {
                "kind": "lambda",
                "params": [{ "name": "x", "type": "Person" }],
                "body": {
                    "kind": "binary", "op": "and",
                    "lhs": {
                        "kind": "expand",
                        "lambda": { "kind": "member", "declaring_type": "Rules", "name": "has_age", "type": "fn(Person) -> bool" },
                        "args": [{ "kind": "param", "name": "x" }],
                        "type": "bool"
                    },
                    "rhs": {
                        "kind": "binary", "op": "ge",
                        "lhs": { "kind": "member", "target": { "kind": "param", "name": "x" }, "name": "age", "type": "int" },
                        "rhs": { "kind": "literal", "value": 18 }
                    }
                }
            }
        }
    },
    "predicate": {
        "kind": "lambda",
        "params": [{ "name": "p", "type": "Person" }],
        "body": {
            "kind": "binary", "op": "and",
            "lhs": {
                "kind": "expand",
                "lambda": { "kind": "member", "declaring_type": "Rules", "name": "is_adult", "type": "fn(Person) -> bool" },
                "args": [{ "kind": "param", "name": "p" }],
                "type": "bool"
            },
            "rhs": { "kind": "member", "target": { "kind": "param", "name": "p" }, "name": "active", "type": "bool" }
        }
    }
}"#;

/// Write `contents` to a temporary `.json` file.
#[allow(dead_code)]
pub fn write_document(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::with_suffix(".json").expect("Failed to create temp file");
    temp_file
        .write_all(contents.as_bytes())
        .expect("Failed to write document");
    temp_file
}

/// Run the `exprkit` binary with `args`.
#[allow(dead_code)]
pub fn run_exprkit(args: &[&std::ffi::OsStr]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_exprkit"))
        .args(args)
        .env_remove("EXPRKIT_LOG")
        .output()
        .expect("Failed to execute exprkit")
}
