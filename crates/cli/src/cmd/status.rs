//! Status command implementation.
//!
//! Displays the recorded state of each installation in a workspace, as left by
//! the last lifecycle command.

use std::path::Path;

use anyhow::{Context, Result};

use chartmart_lib::config::Config;
use chartmart_lib::installation::InstallationState;
use chartmart_lib::manifest::load_workspace;

use crate::output::{OutputFormat, print_error, print_info, print_json, print_stat, symbols};

pub fn cmd_status(workspace: &Path, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = Config::load_default().context("Failed to load config")?;
  let workspace = load_workspace(workspace).context("Failed to load workspace")?;
  let store = config.state_store();
  let state = store.load(&workspace.name).context("Failed to load run state")?;

  if output.is_json() {
    let items: Vec<_> = workspace
      .installations
      .iter()
      .map(|inst| {
        let record = state.installations.get(inst.id());
        serde_json::json!({
          "id": inst.id().as_str(),
          "kind": inst.kind().as_str(),
          "state": record.map(|r| r.state).unwrap_or(InstallationState::Pending),
          "last_result": record.and_then(|r| r.last_result.as_ref()),
        })
      })
      .collect();
    let json_output = serde_json::json!({
      "workspace": workspace.name,
      "run_id": state.run_id,
      "command": state.command,
      "installations": items,
    });
    return print_json(&json_output);
  }

  match (&state.run_id, &state.command) {
    (Some(run_id), Some(command)) => {
      print_info(&format!("Workspace {}: last run {} ({})", workspace.name, run_id, command));
    }
    _ => {
      print_info(&format!(
        "Workspace {}: no recorded runs. Run 'chartmart deploy' to create one.",
        workspace.name
      ));
    }
  }
  print_stat("State file", &store.path_for(&workspace.name).display().to_string());
  println!();

  let mut failed = 0;
  for inst in &workspace.installations {
    let record = state.installations.get(inst.id());
    let current = record.map(|r| r.state).unwrap_or(InstallationState::Pending);
    if current == InstallationState::Failed {
      failed += 1;
    }
    println!("  {} {} {} {}", state_symbol(current), inst.id(), symbols::ARROW, current);

    if verbose && let Some(last) = record.and_then(|r| r.last_result.as_ref()) {
      let marker = if last.succeeded { symbols::SUCCESS } else { symbols::ERROR };
      let first = last.message.lines().next().unwrap_or("");
      println!("      {} {}", marker, first);
    }
  }

  if failed > 0 {
    println!();
    print_error(&format!("{} installation(s) failed in the last run", failed));
  }

  Ok(())
}

fn state_symbol(state: InstallationState) -> &'static str {
  if state.is_terminal_success() {
    symbols::SUCCESS
  } else if state == InstallationState::Failed {
    symbols::ERROR
  } else {
    symbols::INFO
  }
}
