//! Tests for `stitch graph`

use super::common::{stitch_command, write_setup};
use tempfile::TempDir;

const SETUP: &str = r#"
composition: App
types:
  - name: Service
    implements: [IService]
    constructors:
      - parameters: [{ name: factory, type: "Func<IRepo>" }]
  - { name: Repo, implements: [IRepo] }
bindings:
  - { contract: IService, implementation: Service }
  - { contract: IRepo, lifetime: scoped, implementation: Repo }
roots:
  - { name: Service, contract: IService }
"#;

#[test]
fn test_graph_json() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SETUP);

    let output = stitch_command()
        .arg("graph")
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["roots"][0]["name"], "Service");
    let edges = snapshot["edges"].as_array().unwrap();
    assert!(edges.iter().all(|e| e["resolved"] == true));
    assert!(edges.iter().any(|e| e["lazy"] == true), "the Func edge is deferred");
    assert!(snapshot["vertices"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v["type"] == "Repo" && v["lifetime"] == "scoped"));
}

#[test]
fn test_graph_dot() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SETUP);

    let output = stitch_command()
        .args(["graph", "--dot"])
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let dot = String::from_utf8_lossy(&output.stdout);
    assert!(dot.starts_with("digraph stitch {"));
    assert!(dot.contains("\"root_Service\""));
    assert!(dot.contains("style=dashed"));
}
