//! Integration tests for CLI commands.
//!
//! Each test writes a schema, a record file and a request into a temporary
//! project directory and runs the binary against them.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SCHEMA: &str = r#"
[[records]]
name = "Company"
fields = [{ name = "Name", type = "text" }]

[[records]]
name = "Employee"
fields = [
    { name = "Number", type = "integer", nullable = false },
    { name = "Name", type = "text" },
    { name = "Gender", type = "text" },
    { name = "Salary", type = "decimal", nullable = false },
    { name = "Birthday", type = "datetime", nullable = false },
    { name = "Company", type = "record:Company" },
]
"#;

const RECORDS: &str = r#"[
    {"Number": 1, "Name": "Monie", "Gender": "Male", "Salary": 3000, "Birthday": "1986-10-09T00:00:00", "Company": {"Name": "Microsoft"}},
    {"Number": 2, "Name": "Jack", "Gender": "Female", "Salary": 2850, "Birthday": "1976-11-05T00:00:00", "Company": {"Name": "Microsoft Corp"}},
    {"Number": 3, "Name": "Bill", "Gender": "Male", "Salary": 6000, "Birthday": "1990-01-01T08:30:00", "Company": {"Name": "Apple"}},
    {"Number": 4, "Name": "Tom", "Gender": "Female", "Salary": 3000, "Birthday": "1980-05-20"},
    {"Number": 6, "Name": "Lucy", "Gender": "Other", "Salary": 0, "Birthday": "2000-12-31T23:00:00", "Company": {"Name": "Google"}}
]"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("schema.toml"), SCHEMA).unwrap();
        fs::write(dir.path().join("employees.json"), RECORDS).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("gridkit").unwrap();
        cmd.arg("--project").arg(self.dir.path()).arg("--no-color");
        cmd
    }

    fn run(&self, request: &str) -> Command {
        let request = self.write("request.json", request);
        let mut cmd = self.cmd();
        cmd.arg("run")
            .arg("--schema")
            .arg(self.path("schema.toml"))
            .args(["--type", "Employee"])
            .arg("--records")
            .arg(self.path("employees.json"))
            .arg("--request")
            .arg(request)
            .arg("--compact");
        cmd
    }

    fn run_json(&self, request: &str) -> serde_json::Value {
        let output = self.run(request).output().unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn run_filters_sorts_and_pages() {
    let project = Project::new();
    let result = project.run_json(
        r#"{
            "take": 2,
            "sort": [{"field": "Salary", "dir": "desc"}],
            "filter": {"logic": "and", "filters": [
                {"field": "Salary", "operator": "gt", "value": 1000}
            ]}
        }"#,
    );

    assert_eq!(result["total"], 4);
    let numbers: Vec<i64> = result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["Number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, [3, 1]);
    assert!(result.get("errors").is_none());
}

#[test]
fn run_groups_with_aggregates() {
    let project = Project::new();
    let result = project.run_json(
        r#"{
            "group": [{"field": "Gender", "aggregates": [{"field": "Salary", "aggregate": "sum"}]}],
            "aggregate": [{"field": "Salary", "aggregate": "sum"}]
        }"#,
    );

    assert_eq!(result["data"], serde_json::json!([]));
    assert_eq!(result["aggregates"]["Salary"]["sum"], 14850);
    let groups = result["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0]["value"], "Female");
    assert_eq!(groups[0]["field"], "Gender (2)");
    assert_eq!(groups[0]["aggregates"]["Salary"]["sum"], 5850);
    assert_eq!(groups[1]["value"], "Male");
    assert_eq!(groups[1]["aggregates"]["Salary"]["sum"], 9000);
}

#[test]
fn run_reports_soft_filter_errors() {
    let project = Project::new();
    let output = project
        .run(r#"{"filter": {"field": "Salary", "operator": "startswith", "value": "3"}}"#)
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["total"], 5);
    assert_eq!(result["errors"].as_array().unwrap().len(), 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("filter ignored"));
}

#[test]
fn run_reads_request_from_stdin() {
    let project = Project::new();
    project
        .cmd()
        .arg("run")
        .arg("--schema")
        .arg(project.path("schema.toml"))
        .args(["--type", "Employee", "--compact"])
        .arg("--records")
        .arg(project.path("employees.json"))
        .write_stdin(r#"{"filter": {"field": "Company.Name", "operator": "contains", "value": "Microsoft"}}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total":2"#));
}

#[test]
fn run_applies_configured_default_take() {
    let project = Project::new();
    project.write("gridkit.toml", "[query]\ndefault_take = 1\n");
    let result = project.run_json("{}");

    assert_eq!(result["total"], 5);
    assert_eq!(result["data"].as_array().unwrap().len(), 1);
}

#[test]
fn run_uses_configured_utc_offset() {
    let project = Project::new();
    project.write(
        "employees.json",
        r#"[
            {"Number": 1, "Salary": 1, "Birthday": "1986-10-08T16:00:00Z"},
            {"Number": 2, "Salary": 1, "Birthday": "1986-10-09T16:00:00Z"}
        ]"#,
    );
    project.write("gridkit.toml", "[query]\nutc_offset = \"+08:00\"\n");

    let result =
        project.run_json(r#"{"filter": {"field": "Birthday", "operator": "eq", "value": "1986-10-09"}}"#);
    assert_eq!(result["total"], 1);
    assert_eq!(result["data"][0]["Number"], 1);
}

#[test]
fn run_fails_on_unknown_sort_field() {
    let project = Project::new();
    project
        .run(r#"{"sort": [{"field": "Age"}]}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Age"));
}

#[test]
fn run_fails_on_unknown_record_type() {
    let project = Project::new();
    project
        .cmd()
        .arg("run")
        .arg("--schema")
        .arg(project.path("schema.toml"))
        .args(["--type", "Customer"])
        .arg("--records")
        .arg(project.path("employees.json"))
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Customer"));
}

#[test]
fn run_fails_on_missing_records_file() {
    let project = Project::new();
    project
        .cmd()
        .arg("run")
        .arg("--schema")
        .arg(project.path("schema.toml"))
        .args(["--type", "Employee"])
        .arg("--records")
        .arg(project.path("missing.json"))
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_show_prints_toml() {
    let project = Project::new();
    project.write("gridkit.toml", "[query]\ndefault_take = 9\n");
    project
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_take = 9"))
        .stdout(predicate::str::contains("[project]").not());
}

#[test]
fn config_show_text_and_json() {
    let project = Project::new();
    project
        .cmd()
        .args(["config", "show", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UTC offset"));

    project
        .cmd()
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_take\": 0"));
}

#[test]
fn config_file_flag_overrides_layers() {
    let project = Project::new();
    project.write("gridkit.toml", "[query]\ndefault_take = 7\n");
    let explicit = project.write("explicit.toml", "[query]\ndefault_take = 3\n");
    project
        .cmd()
        .arg("--config")
        .arg(explicit)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_take = 3"));
}

#[test]
fn invalid_offset_is_rejected() {
    let project = Project::new();
    project.write("gridkit.toml", "[query]\nutc_offset = \"CET\"\n");
    project
        .cmd()
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("utc_offset"));
}
