//! Implementation of the `chartmart build` and `chartmart validate` commands.
//!
//! Both accept `--only` to restrict the run to some installations plus their
//! transitive dependencies.

use std::path::Path;

use anyhow::Result;
use rand::Rng;

use chartmart_lib::execute::RunKind;

use super::run::{RunOptions, run_lifecycle};

/// Execute the build or validate command.
pub fn cmd_build<R: Rng>(kind: RunKind, workspace: &Path, only: &[String], options: &RunOptions, rng: &mut R) -> Result<()> {
  run_lifecycle(kind, workspace, only, options, rng)
}
