// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

const VALID_WORKFLOW: &str = r#"
name: "smoke"
steps:
  - id: "source"
    module: "StaticSourceModule"
    config:
      items:
        - id: "a"
  - id: "write"
    module: "OutputModule"
    config:
      output_dir: "./out"
    depends_on:
      - source
"#;

const CYCLIC_WORKFLOW: &str = r#"
name: "cyclic"
steps:
  - id: "x"
    module: "StaticSourceModule"
    config:
      items: []
    depends_on:
      - y
  - id: "y"
    module: "OutputModule"
    config:
      output_dir: "./out"
    depends_on:
      - x
"#;

#[test]
fn validate_accepts_a_well_formed_workflow() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("workflow.yaml");
    std::fs::write(&path, VALID_WORKFLOW).unwrap();

    Command::cargo_bin("stacflow")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow is valid"));
}

#[test]
fn validate_rejects_a_cyclic_workflow() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("workflow.yaml");
    std::fs::write(&path, CYCLIC_WORKFLOW).unwrap();

    Command::cargo_bin("stacflow")
        .unwrap()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Cycle"));
}

#[test]
fn validate_fails_on_missing_file() {
    Command::cargo_bin("stacflow")
        .unwrap()
        .arg("validate")
        .arg("/nonexistent/workflow.yaml")
        .assert()
        .failure();
}

#[test]
fn run_executes_a_workflow_end_to_end() {
    let dir = tempfile::TempDir::new().unwrap();
    let out_dir = dir.path().join("out");
    let workflow = format!(
        r#"
name: "smoke-run"
steps:
  - id: "source"
    module: "StaticSourceModule"
    config:
      items:
        - id: "a"
  - id: "write"
    module: "OutputModule"
    config:
      output_dir: "{}"
    depends_on:
      - source
"#,
        out_dir.display()
    );
    let path = dir.path().join("workflow.yaml");
    std::fs::write(&path, workflow).unwrap();

    Command::cargo_bin("stacflow")
        .unwrap()
        .arg("run")
        .arg("--workflow")
        .arg(&path)
        .arg("--checkpoint-dir")
        .arg(dir.path().join("checkpoints"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 items"));

    assert!(out_dir.join("a.json").exists());
    assert!(out_dir.join("manifest.json").exists());
}

#[test]
fn graph_renders_mermaid() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("workflow.yaml");
    std::fs::write(&path, VALID_WORKFLOW).unwrap();

    Command::cargo_bin("stacflow")
        .unwrap()
        .arg("graph")
        .arg(&path)
        .arg("--format")
        .arg("mermaid")
        .assert()
        .success()
        .stdout(predicate::str::contains("source --> write"));
}
