//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// A workspace of three charts and a terraform module:
/// `network <- postgres <- web`, plus an unrelated `dns`.
pub const WORKSPACE: &str = r#"
name: itest
installations:
  - id: network
    kind: terraform
    path: modules/network
  - id: postgres
    kind: chart
    path: charts/postgres
    namespace: data
    depends_on: [network]
  - id: web
    kind: chart
    path: charts/web
    depends_on: [postgres]
  - id: dns
    kind: chart
    path: charts/dns
"#;

/// Isolated test environment.
///
/// Each test gets its own temporary directory with isolated config, data,
/// and workspace paths.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an empty test environment.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Create an environment holding [`WORKSPACE`] with every source directory present.
  pub fn with_workspace() -> Self {
    let env = Self::empty();
    env.write_file("ws/workspace.yaml", WORKSPACE);
    for dir in ["modules/network", "charts/postgres", "charts/web", "charts/dns"] {
      std::fs::create_dir_all(env.workspace_path().join(dir)).unwrap();
    }
    env
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Write an executable shell script relative to the temp directory.
  #[cfg(unix)]
  pub fn write_script(&self, relative_path: &str, content: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    self.write_file(relative_path, content);
    let path = self.temp.path().join(relative_path);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }

  pub fn workspace_path(&self) -> PathBuf {
    self.temp.path().join("ws")
  }

  pub fn config_path(&self) -> PathBuf {
    self.temp.path().join("config").join("config.toml")
  }

  /// Run-state directory (configured through `state_dir`).
  pub fn state_path(&self) -> PathBuf {
    self.temp.path().join("state")
  }

  /// Data path used when no `state_dir` is configured.
  pub fn data_path(&self) -> PathBuf {
    self.temp.path().join("data")
  }

  /// Write a config that uses `helm` and `terraform` as the tool binaries.
  pub fn write_config(&self, helm: &str, terraform: &str) {
    let content = format!(
      "parallelism = 2\ntimeout = \"1m\"\nhelm_bin = \"{}\"\nterraform_bin = \"{}\"\nstate_dir = \"{}\"\n",
      helm,
      terraform,
      self.state_path().display()
    );
    self.write_file("config/config.toml", &content);
  }

  /// Get a pre-configured Command for the chartmart binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `CHARTMART_CONFIG`: Isolated config file
  /// - `XDG_DATA_HOME`: Isolated data path
  /// - `LOCALAPPDATA`: Isolated data path (for Windows)
  pub fn chartmart_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("chartmart");
    for (key, value) in self.isolated_env() {
      cmd.env(key, value);
    }
    cmd.env_remove("CHARTMART_LOG");
    cmd.env_remove("RUST_LOG");
    cmd
  }

  /// Environment variables that point chartmart at this test's directories.
  pub fn isolated_env(&self) -> Vec<(&'static str, PathBuf)> {
    vec![
      ("CHARTMART_CONFIG", self.config_path()),
      ("XDG_DATA_HOME", self.data_path()),
      ("LOCALAPPDATA", self.data_path()),
    ]
  }

  /// Parsed run-state file for the test workspace.
  pub fn recorded_state(&self) -> serde_json::Value {
    let content = std::fs::read_to_string(self.state_path().join("itest.json")).unwrap();
    serde_json::from_str(&content).unwrap()
  }
}
