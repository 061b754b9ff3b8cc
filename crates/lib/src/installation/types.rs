//! Installation types.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{InstallationState, TransitionError};

/// Unique identifier of an installation within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub String);

impl InstallationId {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for InstallationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for InstallationId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for InstallationId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

/// What kind of unit an installation deploys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationKind {
  /// A Helm chart, installed as a release named after the installation id.
  Chart,
  /// A Terraform module, applied in its own directory.
  Terraform,
}

impl InstallationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      InstallationKind::Chart => "chart",
      InstallationKind::Terraform => "terraform",
    }
  }
}

impl fmt::Display for InstallationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for InstallationKind {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "chart" | "helm" => Ok(InstallationKind::Chart),
      "terraform" | "terraform_module" | "terraformModule" => Ok(InstallationKind::Terraform),
      other => Err(ValidationError::UnknownKind(other.to_string())),
    }
  }
}

/// Errors raised while constructing an installation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("installation id must not be empty")]
  EmptyId,

  #[error("installation {0} declares an empty dependency id")]
  EmptyDependency(InstallationId),

  #[error("unknown installation kind: {0} (expected chart or terraform)")]
  UnknownKind(String),
}

/// Outcome of the most recent operation on an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastResult {
  pub succeeded: bool,
  pub message: String,
}

impl LastResult {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      succeeded: true,
      message: message.into(),
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      succeeded: false,
      message: message.into(),
    }
  }
}

/// One chart or module instance in a workspace.
///
/// The lifecycle state is read-only from outside the crate; the orchestrator
/// moves it through the state machine in [`InstallationState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
  id: InstallationId,
  kind: InstallationKind,
  depends_on: BTreeSet<InstallationId>,
  path: PathBuf,
  namespace: String,
  state: InstallationState,
  last_result: Option<LastResult>,
}

impl Installation {
  /// Create a pending installation with no dependencies.
  ///
  /// The source path defaults to the id and the namespace to the id.
  pub fn new(id: impl Into<String>, kind: InstallationKind) -> Result<Self, ValidationError> {
    let id = id.into();
    if id.trim().is_empty() {
      return Err(ValidationError::EmptyId);
    }

    Ok(Self {
      path: PathBuf::from(&id),
      namespace: id.clone(),
      id: InstallationId(id),
      kind,
      depends_on: BTreeSet::new(),
      state: InstallationState::Pending,
      last_result: None,
    })
  }

  /// Parse the kind from its manifest spelling, then construct.
  pub fn parse(id: impl Into<String>, kind: &str) -> Result<Self, ValidationError> {
    Self::new(id, kind.parse()?)
  }

  /// Declare dependencies on other installations in the same workspace.
  pub fn with_dependencies<I, S>(mut self, deps: I) -> Result<Self, ValidationError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    for dep in deps {
      let dep = dep.into();
      if dep.trim().is_empty() {
        return Err(ValidationError::EmptyDependency(self.id.clone()));
      }
      self.depends_on.insert(InstallationId(dep));
    }
    Ok(self)
  }

  pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.path = path.into();
    self
  }

  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = namespace.into();
    self
  }

  /// Seed the starting state from a previously persisted run.
  ///
  /// A recorded in-flight state means the previous run was interrupted
  /// mid-operation, so it is restored as `Failed`.
  pub fn with_recorded_state(mut self, state: InstallationState) -> Self {
    self.state = if state.is_at_rest() {
      state
    } else {
      InstallationState::Failed
    };
    self
  }

  pub fn id(&self) -> &InstallationId {
    &self.id
  }

  pub fn kind(&self) -> InstallationKind {
    self.kind
  }

  pub fn dependencies(&self) -> &BTreeSet<InstallationId> {
    &self.depends_on
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn state(&self) -> InstallationState {
    self.state
  }

  pub fn last_result(&self) -> Option<&LastResult> {
    self.last_result.as_ref()
  }

  pub(crate) fn transition(&mut self, next: InstallationState) -> Result<(), TransitionError> {
    if !self.state.can_transition_to(next) {
      return Err(TransitionError {
        id: self.id.clone(),
        from: self.state,
        to: next,
      });
    }
    self.state = next;
    Ok(())
  }

  pub(crate) fn record(&mut self, result: LastResult) {
    self.last_result = Some(result);
  }
}
