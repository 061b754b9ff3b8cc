//! Lifecycle state machine for installations.
//!
//! The forward track is `Pending -> Building -> Validated -> Deploying -> Deployed`
//! and the teardown track is `* -> Destroying -> Destroyed`. `Failed` is reachable
//! from every in-flight state. Only the orchestrator drives transitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::InstallationId;

/// Lifecycle state of a single installation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationState {
  /// Nothing has been attempted in this run.
  #[default]
  Pending,
  /// The external build (or validation) step is running.
  Building,
  /// The build or validation step succeeded.
  Validated,
  /// The external deploy step is running.
  Deploying,
  /// Deployed successfully.
  Deployed,
  /// The most recent operation failed.
  Failed,
  /// The external destroy step is running.
  Destroying,
  /// Torn down successfully.
  Destroyed,
}

impl InstallationState {
  /// Whether no external operation is running for this state.
  ///
  /// A run may only start from an at-rest state.
  pub fn is_at_rest(self) -> bool {
    !matches!(
      self,
      InstallationState::Building | InstallationState::Deploying | InstallationState::Destroying
    )
  }

  /// Whether the state is a successful end state (`Deployed` or `Destroyed`).
  pub fn is_terminal_success(self) -> bool {
    matches!(self, InstallationState::Deployed | InstallationState::Destroyed)
  }

  /// Whether `self -> next` is an allowed transition.
  pub fn can_transition_to(self, next: InstallationState) -> bool {
    use InstallationState::*;

    match next {
      Building | Destroying => self.is_at_rest(),
      Validated => self == Building,
      Deploying => self == Validated,
      Deployed => self == Deploying,
      Destroyed => self == Destroying,
      Failed => matches!(self, Building | Validated | Deploying | Destroying),
      Pending => false,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      InstallationState::Pending => "pending",
      InstallationState::Building => "building",
      InstallationState::Validated => "validated",
      InstallationState::Deploying => "deploying",
      InstallationState::Deployed => "deployed",
      InstallationState::Failed => "failed",
      InstallationState::Destroying => "destroying",
      InstallationState::Destroyed => "destroyed",
    }
  }
}

impl fmt::Display for InstallationState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An illegal state-machine move was requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition for {id}: {from} -> {to}")]
pub struct TransitionError {
  pub id: InstallationId,
  pub from: InstallationState,
  pub to: InstallationState,
}
