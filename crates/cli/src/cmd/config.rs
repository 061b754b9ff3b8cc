//! Implementation of the `chartmart config` subcommands.

use anyhow::{Context, Result};

use chartmart_lib::config::Config;

use crate::output::{OutputFormat, print_json, print_success};

pub fn cmd_config_get(key: &str) -> Result<()> {
  let config = Config::load_default().context("Failed to load config")?;
  println!("{}", config.get(key)?);
  Ok(())
}

pub fn cmd_config_set(key: &str, value: &str) -> Result<()> {
  let path = Config::default_path();
  let mut config = Config::load(&path).context("Failed to load config")?;
  config.set(key, value)?;
  config.save(&path).context("Failed to save config")?;
  print_success(&format!("{} = {}", key, config.get(key)?));
  Ok(())
}

pub fn cmd_config_list(output: OutputFormat) -> Result<()> {
  let config = Config::load_default().context("Failed to load config")?;

  if output.is_json() {
    return print_json(&config);
  }

  for (key, value) in config.list() {
    println!("{} = {}", key, value);
  }
  Ok(())
}

pub fn cmd_config_path() -> Result<()> {
  println!("{}", Config::default_path().display());
  Ok(())
}
