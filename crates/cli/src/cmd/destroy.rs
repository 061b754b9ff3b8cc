//! Implementation of the `chartmart destroy` command.
//!
//! Tears down every installation in reverse dependency order. An installation
//! is left standing while anything that depends on it failed to come down.

use std::path::Path;

use anyhow::{Result, bail};
use rand::Rng;

use chartmart_lib::execute::RunKind;

use super::run::{RunOptions, run_lifecycle};
use crate::prompts::confirm;

/// Execute the destroy command.
///
/// Prompts for confirmation unless `force` is set.
pub fn cmd_destroy<R: Rng>(workspace: &Path, force: bool, options: &RunOptions, rng: &mut R) -> Result<()> {
  let message = format!("Destroy every installation in {}?", workspace.display());
  if !confirm(&message, force)? {
    bail!("Destroy aborted");
  }
  run_lifecycle(RunKind::Destroy, workspace, &[], options, rng)
}
