//! Implementation of the `chartmart topsort` command.

use std::path::Path;

use anyhow::{Context, Result};

use chartmart_lib::execute::topsort;
use chartmart_lib::manifest::load_workspace;

use crate::output::{OutputFormat, print_json};

/// Print the workspace's installations in dependency order, one per line.
pub fn cmd_topsort(workspace: &Path, output: OutputFormat) -> Result<()> {
  let workspace = load_workspace(workspace).context("Failed to load workspace")?;
  let order = topsort(&workspace.installations).context("Invalid dependency graph")?;

  if output.is_json() {
    let ids: Vec<&str> = order.iter().map(|id| id.as_str()).collect();
    return print_json(&ids);
  }

  for id in &order {
    println!("{}", id);
  }
  Ok(())
}
