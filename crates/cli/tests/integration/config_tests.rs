//! Config, init, and import command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn config_path_honors_env_override() {
  let env = TestEnv::empty();
  env
    .chartmart_cmd()
    .args(["config", "path"])
    .assert()
    .success()
    .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_set_then_get() {
  let env = TestEnv::empty();

  env
    .chartmart_cmd()
    .args(["config", "set", "parallelism", "6"])
    .assert()
    .success();

  env
    .chartmart_cmd()
    .args(["config", "get", "parallelism"])
    .assert()
    .success()
    .stdout("6\n");

  assert!(env.config_path().exists());
}

#[test]
fn config_set_rejects_bad_values() {
  let env = TestEnv::empty();

  env
    .chartmart_cmd()
    .args(["config", "set", "timeout", "eventually"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid value for timeout"));

  env
    .chartmart_cmd()
    .args(["config", "get", "colour"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn config_list_shows_defaults() {
  let env = TestEnv::empty();
  env
    .chartmart_cmd()
    .args(["config", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("parallelism = 2"))
    .stdout(predicate::str::contains("timeout = 30m"));
}

#[test]
fn init_creates_config_once() {
  let env = TestEnv::empty();

  env
    .chartmart_cmd()
    .arg("init")
    .assert()
    .success()
    .stdout(predicate::str::contains("Initialized chartmart configuration"));
  assert!(env.config_path().exists());

  env
    .chartmart_cmd()
    .arg("init")
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists"));

  env.chartmart_cmd().args(["init", "--force"]).assert().success();
}

#[test]
fn import_validates_before_installing() {
  let env = TestEnv::empty();
  env.write_file("team.toml", "parallelism = \"many\"\n");

  env
    .chartmart_cmd()
    .arg("import")
    .arg(env.temp.path().join("team.toml"))
    .assert()
    .failure();
  assert!(!env.config_path().exists());

  env.write_file("team.toml", "parallelism = 5\n");
  env
    .chartmart_cmd()
    .arg("import")
    .arg(env.temp.path().join("team.toml"))
    .assert()
    .success();

  env
    .chartmart_cmd()
    .args(["config", "get", "parallelism"])
    .assert()
    .success()
    .stdout("5\n");
}
