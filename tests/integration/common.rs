//! Common utilities for integration tests

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub fn stitch_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stitch"))
}

/// Write `content` as `setup.yaml` in `dir`
pub fn write_setup(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("setup.yaml");
    fs::write(&path, content).unwrap();
    path
}

/// Run `stitch generate` and parse its JSON output
pub fn generate_json(dir: &Path, setup: &Path) -> Value {
    let output = stitch_command()
        .arg("generate")
        .arg(setup)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "generate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

pub fn root_body<'a>(code: &'a Value, name: &str) -> &'a Vec<Value> {
    code["roots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|root| root["name"] == name)
        .unwrap_or_else(|| panic!("no root named {}", name))["body"]
        .as_array()
        .unwrap()
}

/// Every statement in `body`, ensure and thunk bodies included, in order
pub fn flatten(body: &[Value]) -> Vec<&Value> {
    let mut found = Vec::new();
    for statement in body {
        visit(statement, &mut found);
    }
    found
}

fn visit<'a>(statement: &'a Value, found: &mut Vec<&'a Value>) {
    found.push(statement);
    if let Some(body) = statement["body"].as_array() {
        for nested in body {
            visit(nested, found);
        }
    }
    let mut values: Vec<&Value> = Vec::new();
    if let Some(args) = statement["call"]["args"].as_array() {
        values.extend(args);
    }
    if let Some(items) = statement["values"].as_array() {
        values.extend(items);
    }
    values.push(&statement["value"]);
    for value in values {
        if value["expr"] == "deferred" {
            if let Some(body) = value["body"].as_array() {
                for nested in body {
                    visit(nested, found);
                }
            }
        }
    }
}

/// Statements constructing `ty`
pub fn constructions<'a>(body: &'a [Value], ty: &str) -> Vec<&'a Value> {
    flatten(body)
        .into_iter()
        .filter(|s| s["op"] == "assign-from-call" && s["call"]["type"] == ty)
        .collect()
}
