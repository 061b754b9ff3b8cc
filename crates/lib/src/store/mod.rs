//! Run-state persistence.
//!
//! After each lifecycle command the final state of every installation is
//! written to disk, and the next command seeds its installations from it.
//! The orchestrator itself never reads or writes this store.
//!
//! # Storage Layout
//!
//! ```text
//! <data_dir>/chartmart/state/
//! └── <workspace>.json
//! ```
//!
//! # Example State File
//!
//! ```json
//! {
//!   "workspace": "prod",
//!   "run_id": "18c1f0a2b3c-9f2e01aa",
//!   "command": "deploy",
//!   "installations": {
//!     "postgres": { "state": "deployed", "last_result": { "succeeded": true, "message": "..." } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::execute::RunReport;
use crate::installation::{Installation, InstallationId, InstallationState, LastResult};
use crate::platform::paths::state_dir;

/// Persisted record for one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
  pub state: InstallationState,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_result: Option<LastResult>,
}

/// Persisted state of one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceState {
  pub workspace: String,

  /// Id of the run that last wrote this file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_id: Option<String>,

  /// Command of the run that last wrote this file.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub command: Option<String>,

  #[serde(default)]
  pub installations: BTreeMap<InstallationId, InstallationRecord>,
}

impl WorkspaceState {
  pub fn new(workspace: impl Into<String>) -> Self {
    Self {
      workspace: workspace.into(),
      ..Default::default()
    }
  }

  /// Seed each installation's starting state from this record.
  ///
  /// Installations with no record stay `Pending`.
  pub fn seed(&self, installations: Vec<Installation>) -> Vec<Installation> {
    installations
      .into_iter()
      .map(|inst| match self.installations.get(inst.id()) {
        Some(record) => inst.with_recorded_state(record.state),
        None => inst,
      })
      .collect()
  }

  /// Fold a finished run into the record.
  ///
  /// Only installations that appear in the report are updated; anything out
  /// of the run's scope keeps its previous record.
  pub fn record_run(&mut self, report: &RunReport, installations: &[Installation]) {
    self.run_id = Some(report.run_id.clone());
    self.command = Some(report.kind.to_string());

    for entry in &report.entries {
      let previous = self.installations.get(&entry.id).and_then(|r| r.last_result.clone());
      let last_result = installations
        .iter()
        .find(|i| i.id() == &entry.id)
        .and_then(|i| i.last_result().cloned())
        .or(previous);

      self.installations.insert(
        entry.id.clone(),
        InstallationRecord {
          state: entry.state,
          last_result,
        },
      );
    }
  }

  /// Look up the recorded state of one installation.
  pub fn state_of(&self, id: &str) -> Option<InstallationState> {
    self.installations.get(&InstallationId::from(id)).map(|r| r.state)
  }
}

/// Errors that can occur when working with the state store.
#[derive(Debug, Error)]
pub enum StateStoreError {
  /// Failed to read a state file.
  #[error("failed to read run state {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  /// Failed to write a state file.
  #[error("failed to write run state {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  /// Failed to create the state directory.
  #[error("failed to create run state directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },

  /// Failed to parse a state file.
  #[error("failed to parse run state {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  /// Failed to serialize state.
  #[error("failed to serialize run state: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Directory of per-workspace state files.
#[derive(Debug, Clone)]
pub struct StateStore {
  dir: PathBuf,
}

impl StateStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Store in the platform data directory.
  pub fn default_location() -> Self {
    Self::new(state_dir())
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// State file for a workspace name.
  pub fn path_for(&self, workspace: &str) -> PathBuf {
    self.dir.join(format!("{}.json", file_stem(workspace)))
  }

  /// Load a workspace's state.
  ///
  /// A missing file is an empty state: every installation starts `Pending`.
  pub fn load(&self, workspace: &str) -> Result<WorkspaceState, StateStoreError> {
    let path = self.path_for(workspace);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(workspace, path = %path.display(), "no recorded run state");
        return Ok(WorkspaceState::new(workspace));
      }
      Err(source) => return Err(StateStoreError::Read { path, source }),
    };

    let state: WorkspaceState =
      serde_json::from_str(&content).map_err(|source| StateStoreError::Parse { path: path.clone(), source })?;

    debug!(
      workspace,
      installations = state.installations.len(),
      "run state loaded"
    );
    Ok(state)
  }

  /// Save a workspace's state.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn save(&self, state: &WorkspaceState) -> Result<PathBuf, StateStoreError> {
    let path = self.path_for(&state.workspace);

    fs::create_dir_all(&self.dir).map_err(|source| StateStoreError::CreateDir {
      path: self.dir.clone(),
      source,
    })?;

    let content = serde_json::to_string_pretty(state).map_err(StateStoreError::Serialize)?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content).map_err(|source| StateStoreError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, &path).map_err(|source| StateStoreError::Write {
      path: path.clone(),
      source,
    })?;

    info!(
      workspace = %state.workspace,
      path = %path.display(),
      installations = state.installations.len(),
      "run state saved"
    );
    Ok(path)
  }
}

/// Workspace names become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn file_stem(workspace: &str) -> String {
  let stem: String = workspace
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
        c
      } else {
        '_'
      }
    })
    .collect();
  if stem.is_empty() || stem.chars().all(|c| c == '.') {
    "default".to_string()
  } else {
    stem
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::execute::{InstallationReport, Outcome, RunKind};
  use crate::installation::InstallationKind;
  use tempfile::TempDir;

  fn entry(id: &str, state: InstallationState) -> InstallationReport {
    InstallationReport {
      id: id.into(),
      state,
      outcome: Outcome::Succeeded,
      message: None,
    }
  }

  #[test]
  fn missing_file_loads_empty_state() {
    let temp = TempDir::new().unwrap();
    let store = StateStore::new(temp.path());
    let state = store.load("prod").unwrap();
    assert_eq!(state.workspace, "prod");
    assert!(state.installations.is_empty());
  }

  #[test]
  fn save_then_load() {
    let temp = TempDir::new().unwrap();
    let store = StateStore::new(temp.path().join("state"));

    let mut report = RunReport::new("run-1", RunKind::Deploy);
    report.entries.push(entry("a", InstallationState::Deployed));
    report.entries.push(entry("b", InstallationState::Failed));

    let mut state = WorkspaceState::new("prod");
    state.record_run(&report, &[]);
    let path = store.save(&state).unwrap();

    assert_eq!(path, temp.path().join("state").join("prod.json"));
    assert!(!temp.path().join("state").join("prod.json.tmp").exists());

    let loaded = store.load("prod").unwrap();
    assert_eq!(loaded, state);
    assert_eq!(loaded.run_id.as_deref(), Some("run-1"));
    assert_eq!(loaded.command.as_deref(), Some("deploy"));
    assert_eq!(loaded.state_of("b"), Some(InstallationState::Failed));
  }

  #[test]
  fn corrupt_file_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let store = StateStore::new(temp.path());
    fs::write(store.path_for("prod"), "{not json").unwrap();
    assert!(matches!(store.load("prod"), Err(StateStoreError::Parse { .. })));
  }

  #[test]
  fn out_of_scope_records_survive_a_partial_run() {
    let mut state = WorkspaceState::new("prod");
    let mut first = RunReport::new("r1", RunKind::Deploy);
    first.entries.push(entry("a", InstallationState::Deployed));
    first.entries.push(entry("c", InstallationState::Deployed));
    state.record_run(&first, &[]);

    let mut second = RunReport::new("r2", RunKind::Build);
    second.entries.push(entry("a", InstallationState::Validated));
    state.record_run(&second, &[]);

    assert_eq!(state.state_of("a"), Some(InstallationState::Validated));
    assert_eq!(state.state_of("c"), Some(InstallationState::Deployed));
    assert_eq!(state.run_id.as_deref(), Some("r2"));
  }

  #[test]
  fn seed_restores_recorded_states() {
    let mut state = WorkspaceState::new("prod");
    let mut report = RunReport::new("r1", RunKind::Deploy);
    report.entries.push(entry("a", InstallationState::Deployed));
    report.entries.push(entry("b", InstallationState::Deploying));
    state.record_run(&report, &[]);

    let installs = vec![
      Installation::new("a", InstallationKind::Chart).unwrap(),
      Installation::new("b", InstallationKind::Chart).unwrap(),
      Installation::new("new", InstallationKind::Chart).unwrap(),
    ];
    let seeded = state.seed(installs);

    assert_eq!(seeded[0].state(), InstallationState::Deployed);
    // Interrupted mid-operation
    assert_eq!(seeded[1].state(), InstallationState::Failed);
    assert_eq!(seeded[2].state(), InstallationState::Pending);
  }

  #[test]
  fn workspace_names_are_sanitized() {
    let store = StateStore::new("/tmp/state");
    assert_eq!(store.path_for("team/prod"), PathBuf::from("/tmp/state/team_prod.json"));
    assert_eq!(store.path_for(".."), PathBuf::from("/tmp/state/default.json"));
  }
}
