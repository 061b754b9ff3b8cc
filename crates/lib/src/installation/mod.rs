//! Installation model.
//!
//! An [`Installation`] is one Helm chart or Terraform module instance together
//! with the ids it depends on and its lifecycle state for the current run.

pub mod state;
pub mod types;

pub use state::{InstallationState, TransitionError};
pub use types::{Installation, InstallationId, InstallationKind, LastResult, ValidationError};
