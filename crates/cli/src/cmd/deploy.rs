//! Implementation of the `chartmart deploy` and `chartmart bounce` commands.
//!
//! Deploy builds and releases every installation in dependency order. Bounce
//! does the same but is meant for an already-deployed workspace: nothing is
//! skipped for being up to date.

use std::path::Path;

use anyhow::Result;
use rand::Rng;

use chartmart_lib::execute::RunKind;

use super::run::{RunOptions, run_lifecycle};

pub fn cmd_deploy<R: Rng>(kind: RunKind, workspace: &Path, options: &RunOptions, rng: &mut R) -> Result<()> {
  run_lifecycle(kind, workspace, &[], options, rng)
}
