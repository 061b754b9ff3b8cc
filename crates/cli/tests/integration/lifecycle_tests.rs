//! Lifecycle command integration tests.

use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn deploy_succeeds_and_records_state() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  env
    .chartmart_cmd()
    .arg("deploy")
    .arg(env.workspace_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("deploy complete"))
    .stdout(predicate::str::contains("4 succeeded"));

  let state = env.recorded_state();
  assert_eq!(state["command"], "deploy");
  for id in ["network", "postgres", "web", "dns"] {
    assert_eq!(state["installations"][id]["state"], "deployed", "{id} should be deployed");
  }
}

#[test]
fn deploy_failure_exits_non_zero_and_skips_dependents() {
  let env = TestEnv::with_workspace();
  // Terraform succeeds, every helm call fails
  env.write_config("false", "true");

  env
    .chartmart_cmd()
    .arg("deploy")
    .arg(env.workspace_path())
    .assert()
    .failure()
    .stdout(predicate::str::contains("skipped"))
    .stderr(predicate::str::contains("deploy did not complete"));

  let state = env.recorded_state();
  assert_eq!(state["installations"]["network"]["state"], "deployed");
  assert_eq!(state["installations"]["postgres"]["state"], "failed");
  assert_eq!(state["installations"]["dns"]["state"], "failed");
  assert_eq!(state["installations"]["web"]["state"], "pending");
}

#[test]
fn deploy_json_report_lists_plan_order() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  let output = env
    .chartmart_cmd()
    .args(["--output", "json", "deploy"])
    .arg(env.workspace_path())
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["command"], "deploy");
  assert_eq!(report["success"], true);
  let ids: Vec<&str> = report["entries"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, vec!["dns", "network", "postgres", "web"]);
}

#[test]
fn missing_source_directory_fails_that_installation() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");
  std::fs::remove_dir_all(env.workspace_path().join("charts/dns")).unwrap();

  env
    .chartmart_cmd()
    .arg("deploy")
    .arg(env.workspace_path())
    .assert()
    .failure()
    .stdout(predicate::str::contains("source directory not found"));

  let state = env.recorded_state();
  assert_eq!(state["installations"]["dns"]["state"], "failed");
  assert_eq!(state["installations"]["web"]["state"], "deployed");
}

#[test]
fn build_only_touches_dependency_closure() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  env
    .chartmart_cmd()
    .arg("build")
    .arg("--workspace")
    .arg(env.workspace_path())
    .args(["--only", "postgres"])
    .assert()
    .success()
    .stdout(predicate::str::contains("2 succeeded"));

  let state = env.recorded_state();
  assert_eq!(state["installations"]["network"]["state"], "validated");
  assert_eq!(state["installations"]["postgres"]["state"], "validated");
  assert!(state["installations"].get("web").is_none());
  assert!(state["installations"].get("dns").is_none());
}

#[test]
fn validate_runs_whole_workspace() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  env
    .chartmart_cmd()
    .arg("validate")
    .arg("-w")
    .arg(env.workspace_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("validate complete"));
}

#[test]
fn bounce_after_deploy_redeploys() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  env.chartmart_cmd().arg("deploy").arg(env.workspace_path()).assert().success();

  env
    .chartmart_cmd()
    .arg("bounce")
    .arg(env.workspace_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("4 succeeded"));

  assert_eq!(env.recorded_state()["command"], "bounce");
}

#[test]
fn destroy_with_force_tears_down() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  env.chartmart_cmd().arg("deploy").arg(env.workspace_path()).assert().success();

  env
    .chartmart_cmd()
    .arg("destroy")
    .arg(env.workspace_path())
    .arg("--force")
    .assert()
    .success()
    .stdout(predicate::str::contains("destroy complete"));

  let state = env.recorded_state();
  for id in ["network", "postgres", "web", "dns"] {
    assert_eq!(state["installations"][id]["state"], "destroyed");
  }
}

#[test]
fn destroy_failure_blocks_dependencies() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");
  env.chartmart_cmd().arg("deploy").arg(env.workspace_path()).assert().success();

  // Helm can no longer uninstall anything
  env.write_config("false", "true");
  env
    .chartmart_cmd()
    .arg("destroy")
    .arg(env.workspace_path())
    .arg("--force")
    .assert()
    .failure()
    .stdout(predicate::str::contains("blocked"));

  let state = env.recorded_state();
  assert_eq!(state["installations"]["web"]["state"], "failed");
  // The terraform module stays up while postgres depends on it
  assert_eq!(state["installations"]["network"]["state"], "deployed");
}

#[test]
fn status_shows_recorded_states() {
  let env = TestEnv::with_workspace();
  env.write_config("true", "true");

  env
    .chartmart_cmd()
    .arg("status")
    .arg(env.workspace_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("no recorded runs"));

  env.chartmart_cmd().arg("deploy").arg(env.workspace_path()).assert().success();

  env
    .chartmart_cmd()
    .arg("status")
    .arg(env.workspace_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("postgres → deployed"));
}

#[test]
fn status_reports_failed_installations() {
  let env = TestEnv::with_workspace();
  env.write_config("false", "true");

  env.chartmart_cmd().arg("deploy").arg(env.workspace_path()).assert().failure();

  env
    .chartmart_cmd()
    .arg("status")
    .arg(env.workspace_path())
    .assert()
    .success()
    .stdout(predicate::str::contains("network → deployed"))
    .stderr(predicate::str::contains("2 installation(s) failed in the last run"));
}

#[test]
fn state_defaults_to_data_directory() {
  let env = TestEnv::with_workspace();
  env.write_file("config/config.toml", "helm_bin = \"true\"\nterraform_bin = \"true\"\n");

  env.chartmart_cmd().arg("deploy").arg(env.workspace_path()).assert().success();

  assert!(
    env
      .data_path()
      .join("chartmart")
      .join("state")
      .join("itest.json")
      .exists()
  );
}

#[test]
fn interrupt_lets_running_tool_finish() {
  let env = TestEnv::with_workspace();
  let marker = env.temp.path().join("apply_finished");
  let terraform = env.write_script(
    "bin/terraform",
    &format!(
      "#!/bin/sh\nif [ \"$1\" = apply ]; then\n  sleep 2\n  touch '{}'\nfi\n",
      marker.display()
    ),
  );
  env.write_config("true", &terraform.display().to_string());

  // chartmart leads its own group so the interrupt reaches it the way a
  // terminal Ctrl-C would, without touching the test harness.
  let mut command = Command::new(env!("CARGO_BIN_EXE_chartmart"));
  command
    .arg("deploy")
    .arg(env.workspace_path())
    .env_remove("CHARTMART_LOG")
    .env_remove("RUST_LOG")
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .process_group(0);
  for (key, value) in env.isolated_env() {
    command.env(key, value);
  }
  let child = command.spawn().unwrap();

  thread::sleep(Duration::from_millis(1000));
  let status = Command::new("/bin/sh")
    .args(["-c", &format!("kill -INT -{}", child.id())])
    .status()
    .unwrap();
  assert!(status.success());

  let output = child.wait_with_output().unwrap();
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(!output.status.success());
  assert!(stdout.contains("cancelled"), "stdout: {stdout}");
  assert!(marker.exists(), "terraform apply was interrupted");

  let state = env.recorded_state();
  assert_eq!(state["installations"]["network"]["state"], "deployed");
  assert_eq!(state["installations"]["dns"]["state"], "deployed");
  assert_eq!(state["installations"]["postgres"]["state"], "pending");
  assert_eq!(state["installations"]["web"]["state"], "pending");
}
