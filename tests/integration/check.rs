//! Tests for `stitch check`

use super::common::write_setup;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stitch() -> Command {
    Command::cargo_bin("stitch").unwrap()
}

#[test]
fn test_check_all_resolved() {
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
  - { name: Service, contract: IService }
  - { name: Concrete, contract: Service }
"#,
    );

    stitch()
        .arg("check")
        .arg(&setup)
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("All 2 root(s) of 'App' resolved"));
}

#[test]
fn test_check_reports_failures() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - name: Service
    implements: [IService]
    constructors:
      - parameters: [{ name: repo, type: IRepo }]
bindings:
  - { contract: IService, implementation: Service }
roots:
  - { name: Service, contract: IService }
"#,
    );

    stitch()
        .arg("check")
        .arg(&setup)
        .current_dir(temp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("0 of 1 root(s) resolved"))
        .stderr(predicate::str::contains("error[STI003]").and(predicate::str::contains("chain:")));
}

#[test]
fn test_check_cycle_without_deferral() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(
        temp.path(),
        r#"
composition: App
types:
  - name: A
    constructors:
      - parameters: [{ name: b, type: B }]
  - name: B
    constructors:
      - parameters: [{ name: a, type: A }]
roots:
  - { name: A, contract: A }
"#,
    );

    stitch()
        .arg("check")
        .arg(&setup)
        .current_dir(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("STI004"));
}

#[test]
fn test_check_lifetime_mismatch_as_error() {
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
    std::fs::write(temp.path().join("stitch.yaml"), "lifetime_mismatch: error\n").unwrap();

    stitch()
        .arg("check")
        .arg(&setup)
        .current_dir(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[STI005]"));
}

#[test]
fn test_check_invalid_setup() {
    let temp = TempDir::new().unwrap();
    let setup = write_setup(temp.path(), "composition: App\nbindings:\n  - contract: IService\n");

    stitch()
        .arg("check")
        .arg(&setup)
        .current_dir(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("must declare exactly one of"));
}

#[test]
fn test_check_missing_setup() {
    stitch()
        .args(["check", "does-not-exist.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_check_prints_diagnostics_reported_before_a_setup_error() {
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
  - { contract: IService, implementation: New }
  - { contract: IRepo }
"#,
    );

    stitch()
        .args(["check", "--verbose"])
        .arg(&setup)
        .current_dir(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("info[STI008]").and(predicate::str::contains("must declare exactly one of")));
}
