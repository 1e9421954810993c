//! Tests for `stitch generate`

use super::common::{constructions, flatten, generate_json, root_body, stitch_command, write_setup};
use std::fs;
use tempfile::TempDir;

const SERVICES: &str = r#"
composition: App
types:
  - name: Service
    implements: [IService]
    constructors:
      - parameters:
          - { name: first, type: IRepo }
          - { name: second, type: IRepo }
          - { name: a, type: IDependency }
          - { name: b, type: IDependency }
  - name: Repo
    implements: [IRepo]
  - name: Dependency
    implements: [IDependency]
bindings:
  - contract: IService
    implementation: Service
  - contract: IRepo
    lifetime: singleton
    implementation: Repo
  - contract: IDependency
    implementation: Dependency
roots:
  - name: Service
    contract: IService
  - name: Repo
    contract: IRepo
"#;

#[test]
fn test_generate_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SERVICES);

    let run = || {
        stitch_command()
            .arg("generate")
            .arg(&setup)
            .current_dir(temp.path())
            .output()
            .unwrap()
    };
    let first = run();
    let second = run();

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout, "output should be byte-identical");
}

#[test]
fn test_singleton_shared_and_transient_distinct() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SERVICES);
    let code = generate_json(temp.path(), &setup);

    let fields = code["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 1, "one field for the singleton");
    assert_eq!(fields[0]["name"], "_repo1");
    assert_eq!(fields[0]["lifetime"], "singleton");

    let body = root_body(&code, "Service");
    assert_eq!(constructions(body, "Repo").len(), 1);
    assert_eq!(constructions(body, "Dependency").len(), 2);

    let service = constructions(body, "Service")[0];
    let args = service["call"]["args"].as_array().unwrap();
    assert_eq!(args[0], args[1], "both repo parameters see the same field");
    assert_eq!(args[0]["expr"], "field");
    assert_ne!(args[2], args[3], "transients are distinct");

    // The second root reuses the same field
    let repo_body = root_body(&code, "Repo");
    assert_eq!(repo_body[0]["op"], "ensure-initialized");
    assert_eq!(repo_body[0]["target"]["name"], "_repo1");
    assert_eq!(repo_body[0]["lock"], true);
}

#[test]
fn test_lazy_cycle_is_emitted() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - name: Tool
    implements: [ITool]
    constructors:
      - parameters: [{ name: view, type: "Lazy<IView>" }]
  - name: View
    implements: [IView]
    constructors:
      - parameters: [{ name: model, type: IModel }]
  - name: ModelBase
    kind: abstract
    members:
      - { name: Tool, kind: property, type: ITool, ordinal: 0 }
  - name: Model
    base: ModelBase
    implements: [IModel]
bindings:
  - { contract: ITool, implementation: Tool }
  - { contract: IView, implementation: View }
  - { contract: IModel, implementation: Model }
roots:
  - { name: Tool, contract: ITool }
"#,
    );
    let code = generate_json(temp.path(), &setup);
    let body = root_body(&code, "Tool");

    assert_eq!(body[0]["op"], "declare-local");
    let tool = body[0]["name"].as_str().unwrap();

    let assignment = flatten(body)
        .into_iter()
        .find(|s| s["op"] == "assign-member")
        .unwrap();
    assert_eq!(assignment["member"], "Tool");
    assert_eq!(assignment["values"][0]["expr"], "local");
    assert_eq!(assignment["values"][0]["name"], tool);
}

#[test]
fn test_collection_gathers_tagged_bindings_in_order() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - { name: Alpha, implements: [IDependency] }
  - { name: Beta, implements: [IDependency] }
  - { name: Gamma, implements: [IDependency] }
bindings:
  - { contract: IDependency, tag: 1, implementation: Alpha }
  - { contract: IDependency, tag: 2, implementation: Beta }
  - { contract: IDependency, tag: 3, implementation: Gamma }
roots:
  - { name: All, contract: "IEnumerable<IDependency>" }
"#,
    );
    let code = generate_json(temp.path(), &setup);
    let statements = flatten(root_body(&code, "All"));

    let order: Vec<&str> = statements
        .iter()
        .filter(|s| s["op"] == "assign-from-call" && s["call"]["call"] == "constructor")
        .map(|s| s["call"]["type"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["Alpha", "Beta", "Gamma"]);

    let collection = statements
        .iter()
        .find(|s| s["call"]["call"] == "collection")
        .unwrap();
    assert_eq!(collection["call"]["kind"], "enumerable");
    assert_eq!(collection["call"]["args"].as_array().unwrap().len(), 3);
}

#[test]
fn test_members_injected_by_ordinal() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - name: Log
  - name: Service
    members:
      - { name: Late, kind: property, type: Log, ordinal: 5 }
      - { name: Ignored, kind: property, type: Log }
      - { name: Early, kind: field, type: Log, ordinal: -1 }
      - name: Init
        kind: method
        ordinal: 0
        parameters: [{ name: log, type: Log }]
roots:
  - { name: Service, contract: Service }
"#,
    );
    let code = generate_json(temp.path(), &setup);

    let members: Vec<&str> = flatten(root_body(&code, "Service"))
        .into_iter()
        .filter(|s| s["op"] == "assign-member")
        .map(|s| s["member"].as_str().unwrap())
        .collect();
    assert_eq!(members, vec!["Early", "Init", "Late"]);
}

#[test]
fn test_unresolved_tuple_root_reports_once() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - { name: Service, implements: [IService] }
bindings:
  - { contract: IService, implementation: Service }
roots:
  - { name: Pair, contract: "(IService, IMissing)" }
  - { name: Service, contract: IService }
"#,
    );

    let output = stitch_command()
        .arg("generate")
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("STI003").count(), 1, "stderr: {}", stderr);
    assert!(stderr.contains("IMissing"));
    assert!(stderr.contains("in root 'Pair'"));

    // Roots that resolved are still generated
    let code: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = code["roots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Service"]);
}

#[test]
fn test_shadowed_binding_reported_in_verbose_mode() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - { name: Old, implements: [IService] }
  - { name: New, implements: [IService] }
bindings:
  - { contract: IService, implementation: Old }
  - { contract: IService, implementation: New, location: { file: app.cs, line: 9 } }
roots:
  - { name: Service, contract: IService }
"#,
    );

    let quiet = stitch_command()
        .arg("generate")
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(quiet.status.success());
    assert!(!String::from_utf8_lossy(&quiet.stderr).contains("STI008"));

    let verbose = stitch_command()
        .arg("generate")
        .arg(&setup)
        .arg("--verbose")
        .current_dir(temp.path())
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&verbose.stderr);
    assert!(stderr.contains("info[STI008]"), "stderr: {}", stderr);
    assert!(stderr.contains("app.cs:9:0"));

    let code: serde_json::Value = serde_json::from_slice(&verbose.stdout).unwrap();
    assert_eq!(constructions(root_body(&code, "Service"), "New").len(), 1);
}

#[test]
fn test_lifetime_mismatch_is_a_warning() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - name: Cache
    constructors:
      - parameters: [{ name: session, type: Session }]
  - name: Session
bindings:
  - { contract: Cache, lifetime: singleton, implementation: Cache }
  - { contract: Session, lifetime: per-resolve, implementation: Session }
roots:
  - { name: Cache, contract: Cache }
"#,
    );

    let output = stitch_command()
        .arg("generate")
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning[STI005]"), "stderr: {}", stderr);
}

#[test]
fn test_config_file_in_working_directory() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SERVICES);
    fs::write(temp.path().join("stitch.yaml"), "field_prefix: m_\n").unwrap();

    let code = generate_json(temp.path(), &setup);
    assert_eq!(code["fields"][0]["name"], "m_repo1");
}

#[test]
fn test_explicit_config_disables_locking() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SERVICES);
    let config = temp.path().join("single-threaded.yaml");
    fs::write(&config, "thread_safe: false\n").unwrap();

    let output = stitch_command()
        .arg("--config")
        .arg(&config)
        .arg("generate")
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let code: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(root_body(&code, "Repo")[0]["lock"], false);
}

#[test]
fn test_generate_writes_files() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SERVICES);
    let out = temp.path().join("app.yaml");
    let graph = temp.path().join("graph.json");

    let output = stitch_command()
        .arg("generate")
        .arg(&setup)
        .args(["--format", "yaml", "--out"])
        .arg(&out)
        .arg("--graph")
        .arg(&graph)
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let content = fs::read_to_string(&out).unwrap();
    assert!(content.contains("composition: App"));
    assert!(content.contains("fingerprint:"));

    let snapshot: serde_json::Value = serde_json::from_str(&fs::read_to_string(&graph).unwrap()).unwrap();
    assert_eq!(snapshot["roots"].as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_config_is_fatal() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), SERVICES);

    let output = stitch_command()
        .args(["--config", "missing.yaml", "generate"])
        .arg(&setup)
        .current_dir(temp.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config file not found"));
}
