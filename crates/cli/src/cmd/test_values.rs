//! Implementation of the `chartmart test` command.

use std::path::Path;

use anyhow::{Context, Result};

use chartmart_lib::manifest::check_values_file;

use crate::output::{OutputFormat, print_json, print_success};

/// Check that a values file parses as a YAML mapping.
pub fn cmd_test(file: &Path, output: OutputFormat) -> Result<()> {
  let mapping = check_values_file(file).context("Values check failed")?;

  if output.is_json() {
    let keys: Vec<&str> = mapping.keys().filter_map(|k| k.as_str()).collect();
    return print_json(&serde_json::json!({
      "file": file.display().to_string(),
      "valid": true,
      "keys": keys,
    }));
  }

  print_success(&format!(
    "{} is a valid values file ({} top-level key(s))",
    file.display(),
    mapping.len()
  ));
  Ok(())
}
