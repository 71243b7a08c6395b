// ABOUTME: Integration tests for the deployer CLI commands.
// ABOUTME: Validates --help output, init, validate and run behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn deployer_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("deployer"));
    cmd.env_remove("DATASOURCE_URL");
    cmd
}

const FAILING_PLAN: &str = r#"
namespace:
  project: shop
  stage: dev
artifact: shop.war
settle: 1s
steps:
  - transition: provision_started
  - fail: image pull failed
"#;

const REJECTING_PLAN: &str = r#"
namespace:
  project: shop
  stage: dev
artifact: shop.war
settle: 1s
configurations:
  - kind: datasource
    id: main
    keys:
      - name: url
        required: true
steps:
  - add:
      kind: datasource
      id: main
  - submit:
      force: true
  - transition: inspection_finished
"#;

#[test]
fn help_shows_commands() {
    deployer_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn init_creates_plan_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let plan_path = temp_dir.path().join("deployer.yml");

    deployer_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "shop", "--stage", "qa"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created deployer.yml"));

    assert!(plan_path.exists(), "deployer.yml should be created");
    let content = fs::read_to_string(&plan_path).unwrap();
    assert!(content.contains("project: shop"));
    assert!(content.contains("stage: qa"));
}

#[test]
fn init_refuses_to_overwrite_existing_plan() {
    let temp_dir = tempfile::tempdir().unwrap();
    let plan_path = temp_dir.path().join("deployer.yml");

    fs::write(&plan_path, "existing: plan").unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&plan_path).unwrap(), "existing: plan");
}

#[test]
fn init_project_requires_stage() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "shop"])
        .assert()
        .failure();
}

#[test]
fn validate_reports_valid_plan() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Plan is valid"));
}

#[test]
fn validate_without_plan_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("plan file not found"));
}

#[test]
fn run_replays_template_plan() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("configuration_added"))
        .stdout(predicate::str::contains("configuration_finished"))
        .stdout(predicate::str::contains("artifact_stored"))
        .stdout(predicate::str::contains("Deployment complete!"));
}

#[test]
fn run_only_prints_requested_kinds() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .args(["run", "--only", "artifact_stored"])
        .assert()
        .success()
        .stdout(predicate::str::contains("artifact_stored"))
        .stdout(predicate::str::contains("configuration_added").not());
}

#[test]
fn run_rejects_unknown_kind_filter() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .args(["run", "--only", "warp_speed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown change kind"));
}

#[test]
fn run_json_emits_change_lines() {
    let temp_dir = tempfile::tempdir().unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .success();

    let output = deployer_cmd()
        .current_dir(temp_dir.path())
        .args(["run", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let changes: Vec<serde_json::Value> = stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter(|value| value["event"] == "change")
        .collect();
    assert!(!changes.is_empty());
    assert_eq!(changes[0]["change"]["kind"], "inspection_started");
    assert_eq!(changes[0]["change"]["state"]["version"], 1);
}

#[test]
fn run_failing_plan_exits_with_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let plan_path = temp_dir.path().join("failing.yml");
    fs::write(&plan_path, FAILING_PLAN).unwrap();

    deployer_cmd()
        .args(["run", "--plan"])
        .arg(&plan_path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed"))
        .stderr(predicate::str::contains("image pull failed"));
}

#[test]
fn run_stops_at_rejected_step() {
    let temp_dir = tempfile::tempdir().unwrap();
    let plan_path = temp_dir.path().join("deployer.yml");
    fs::write(&plan_path, REJECTING_PLAN).unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("step 2 (submit (forced)) failed"));
}

#[test]
fn run_keep_going_records_warning() {
    let temp_dir = tempfile::tempdir().unwrap();
    let plan_path = temp_dir.path().join("deployer.yml");
    fs::write(&plan_path, REJECTING_PLAN).unwrap();

    deployer_cmd()
        .current_dir(temp_dir.path())
        .args(["run", "--keep-going"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inspection_finished"))
        .stdout(predicate::str::contains("1 rejected"))
        .stderr(predicate::str::contains("Warning: step 2"));
}
