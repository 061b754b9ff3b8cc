//! Types for lifecycle execution.
//!
//! This module defines the error types, per-run report types, and configuration
//! for driving installations through build, validate, deploy, and destroy.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::installation::{InstallationId, InstallationState, TransitionError};

/// Default worker-pool size. Small on purpose: correctness over throughput.
pub const DEFAULT_PARALLELISM: usize = 2;

/// Default per-operation timeout for external tool invocations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Fatal problems with the installation set, detected before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
  /// Two installations share an id.
  #[error("duplicate installation id: {0}")]
  DuplicateInstallation(InstallationId),

  /// An installation depends on an id that is not in the workspace.
  #[error("installation {installation} depends on unknown installation {dependency}")]
  UnknownDependency {
    installation: InstallationId,
    dependency: InstallationId,
  },

  /// The dependency relation contains a cycle. The path starts and ends on
  /// the same id and follows dependency -> dependent edges.
  #[error("dependency cycle detected: {}", format_cycle(.0))]
  Cycle(Vec<InstallationId>),
}

fn format_cycle(path: &[InstallationId]) -> String {
  path.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(" -> ")
}

/// Errors from resolving an "only" filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
  #[error("unknown installation: {0}")]
  UnknownInstallation(InstallationId),

  #[error("scope request names no installations")]
  Empty,
}

/// A single external operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
  /// The external tool exited unsuccessfully.
  #[error("command {}: {command}{}", exit_status(.code), stderr_suffix(.stderr))]
  CommandFailed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The external tool could not be started.
  #[error("failed to run {command}: {message}")]
  Spawn { command: String, message: String },

  /// The chart or module source directory does not exist.
  #[error("source directory not found: {0}")]
  MissingSource(String),

  /// The external step reported failure without a process exit status.
  #[error("{0}")]
  Rejected(String),

  /// The operation did not finish within the configured timeout.
  #[error("{operation} timed out after {}", format_timeout(.after))]
  Timeout { operation: Operation, after: Duration },

  /// The worker running the operation died before reporting.
  #[error("operation aborted: {0}")]
  Aborted(String),
}

fn format_timeout(after: &Duration) -> String {
  humantime::format_duration(*after).to_string()
}

fn exit_status(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("failed with exit code {}", code),
    None => "terminated by signal".to_string(),
  }
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!("\n{}", stderr)
  }
}

/// Errors that stop a run before (or instead of) executing it.
#[derive(Debug, Error)]
pub enum RunError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Scope(#[from] ScopeError),

  #[error(transparent)]
  Transition(#[from] TransitionError),
}

/// An external step the orchestrator can invoke for an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  Build,
  Validate,
  Deploy,
  Destroy,
}

impl Operation {
  /// State entered while the operation runs.
  pub fn running_state(self) -> InstallationState {
    match self {
      Operation::Build | Operation::Validate => InstallationState::Building,
      Operation::Deploy => InstallationState::Deploying,
      Operation::Destroy => InstallationState::Destroying,
    }
  }

  /// State entered when the operation succeeds.
  pub fn success_state(self) -> InstallationState {
    match self {
      Operation::Build | Operation::Validate => InstallationState::Validated,
      Operation::Deploy => InstallationState::Deployed,
      Operation::Destroy => InstallationState::Destroyed,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Operation::Build => "build",
      Operation::Validate => "validate",
      Operation::Deploy => "deploy",
      Operation::Destroy => "destroy",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Which lifecycle command produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
  Build,
  Validate,
  Deploy,
  Bounce,
  Destroy,
}

impl RunKind {
  /// External steps run, in order, for each admitted installation.
  pub fn operations(self) -> &'static [Operation] {
    match self {
      RunKind::Build => &[Operation::Build],
      RunKind::Validate => &[Operation::Validate],
      RunKind::Deploy | RunKind::Bounce => &[Operation::Build, Operation::Deploy],
      RunKind::Destroy => &[Operation::Destroy],
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      RunKind::Build => "build",
      RunKind::Validate => "validate",
      RunKind::Deploy => "deploy",
      RunKind::Bounce => "bounce",
      RunKind::Destroy => "destroy",
    }
  }
}

impl fmt::Display for RunKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// How a single installation fared in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Every step of the run succeeded.
  Succeeded,
  /// A step failed; the installation is `Failed`.
  Failed(OperationError),
  /// Never started because a dependency failed or was skipped.
  Skipped { failed_dependency: InstallationId },
  /// Destroy never started because a dependent was not torn down.
  Blocked { dependent: InstallationId },
  /// Never started because the run was cancelled.
  Cancelled,
}

impl Outcome {
  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Succeeded)
  }

  pub fn label(&self) -> &'static str {
    match self {
      Outcome::Succeeded => "succeeded",
      Outcome::Failed(_) => "failed",
      Outcome::Skipped { .. } => "skipped",
      Outcome::Blocked { .. } => "blocked",
      Outcome::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for Outcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Outcome::Succeeded => f.write_str("succeeded"),
      Outcome::Failed(e) => write!(f, "failed: {}", e),
      Outcome::Skipped { failed_dependency } => write!(f, "skipped (dependency {} did not succeed)", failed_dependency),
      Outcome::Blocked { dependent } => write!(f, "blocked (dependent {} was not destroyed)", dependent),
      Outcome::Cancelled => f.write_str("cancelled"),
    }
  }
}

/// Final record for one installation in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationReport {
  pub id: InstallationId,
  pub state: InstallationState,
  pub outcome: Outcome,
  /// Output of the last successful step, if the tool printed anything.
  pub message: Option<String>,
}

/// Result of one lifecycle command.
///
/// Entries follow the executed plan's flattened order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub run_id: String,
  pub kind: RunKind,
  pub entries: Vec<InstallationReport>,
}

impl RunReport {
  pub fn new(run_id: impl Into<String>, kind: RunKind) -> Self {
    Self {
      run_id: run_id.into(),
      kind,
      entries: Vec::new(),
    }
  }

  /// Returns true if every installation in the run succeeded.
  pub fn is_success(&self) -> bool {
    self.entries.iter().all(|e| e.outcome.is_success())
  }

  pub fn get(&self, id: &str) -> Option<&InstallationReport> {
    self.entries.iter().find(|e| e.id.as_str() == id)
  }

  pub fn ids(&self) -> Vec<&str> {
    self.entries.iter().map(|e| e.id.as_str()).collect()
  }

  pub fn succeeded(&self) -> usize {
    self.count(|o| matches!(o, Outcome::Succeeded))
  }

  pub fn failed(&self) -> usize {
    self.count(|o| matches!(o, Outcome::Failed(_)))
  }

  pub fn skipped(&self) -> usize {
    self.count(|o| matches!(o, Outcome::Skipped { .. }))
  }

  pub fn blocked(&self) -> usize {
    self.count(|o| matches!(o, Outcome::Blocked { .. }))
  }

  pub fn cancelled(&self) -> usize {
    self.count(|o| matches!(o, Outcome::Cancelled))
  }

  fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
    self.entries.iter().filter(|e| pred(&e.outcome)).count()
  }
}

/// Configuration for lifecycle execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of installations operated on at once.
  pub parallelism: usize,

  /// Upper bound on a single external operation. `None` disables the limit.
  pub timeout: Option<Duration>,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: DEFAULT_PARALLELISM,
      timeout: Some(DEFAULT_TIMEOUT),
    }
  }
}

/// Cooperative cancellation flag shared between the orchestrator and its caller.
///
/// Cancelling stops admission of new waves; operations already running finish.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}
