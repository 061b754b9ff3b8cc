//! Chart values file checks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuesError {
  #[error("failed to read values file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("values file {} is not valid YAML: {source}", path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("values file {} must contain a mapping at the top level, found {found}", path.display())]
  NotAMapping { path: PathBuf, found: &'static str },
}

/// Parse a values file and require a top-level mapping.
///
/// An empty file is an empty mapping, as helm treats it.
pub fn check_values_file(path: &Path) -> Result<Mapping, ValuesError> {
  let content = fs::read_to_string(path).map_err(|source| ValuesError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  let value: Value = serde_yaml::from_str(&content).map_err(|source| ValuesError::Parse {
    path: path.to_path_buf(),
    source,
  })?;

  match value {
    Value::Mapping(mapping) => Ok(mapping),
    Value::Null => Ok(Mapping::new()),
    other => Err(ValuesError::NotAMapping {
      path: path.to_path_buf(),
      found: kind_of(&other),
    }),
  }
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Sequence(_) => "a sequence",
    Value::Mapping(_) => "a mapping",
    Value::Tagged(_) => "a tagged value",
  }
}
