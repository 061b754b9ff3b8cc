//! Implementation of the `chartmart init` and `chartmart import` commands.
//!
//! Both write the CLI config file; `import` validates a file from elsewhere first.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use chartmart_lib::config::{Config, import_config, init_config};

use crate::output::symbols;

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the config file exists and `force` is not set.
pub fn cmd_init(force: bool) -> Result<()> {
  let path = Config::default_path();
  let config = init_config(&path, force).context("Failed to initialize configuration")?;

  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    "Initialized chartmart configuration!".green().bold()
  );
  println!();
  println!("  {} Config file: {}", symbols::INFO.cyan(), path.display());
  println!("  {} Parallelism: {}", symbols::INFO.cyan(), config.parallelism);
  println!("  {} Timeout:     {}", symbols::INFO.cyan(), config.timeout);
  println!();
  println!("{}", "Next steps:".bold());
  println!("  1. Describe your installations in {}", "workspace.yaml".cyan());
  println!("  2. Run: {}", "chartmart deploy <WORKSPACE>".cyan());

  Ok(())
}

/// Execute the import command.
pub fn cmd_import(file: &Path) -> Result<()> {
  let dest = Config::default_path();
  import_config(file, &dest).with_context(|| format!("Failed to import {}", file.display()))?;

  println!(
    "{} Imported {} {} {}",
    symbols::SUCCESS.green(),
    file.display(),
    symbols::ARROW,
    dest.display()
  );
  Ok(())
}
