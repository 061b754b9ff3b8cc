//! CLI configuration.
//!
//! Settings live in a TOML file at `<config_dir>/chartmart/config.toml`, or
//! wherever `CHARTMART_CONFIG` points. A missing file means defaults.
//!
//! ```toml
//! parallelism = 4
//! timeout = "45m"
//! helm_bin = "/usr/local/bin/helm"
//! terraform_bin = "terraform"
//! state_dir = "/var/lib/chartmart/state"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::CONFIG_ENV;
use crate::execute::types::{DEFAULT_PARALLELISM, DEFAULT_TIMEOUT};
use crate::execute::{ExecuteConfig, Toolchain};
use crate::platform::paths::config_dir;
use crate::store::StateStore;

/// File name of the config file inside the config directory.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Every settable key, in display order.
pub const KEYS: [&str; 5] = ["parallelism", "timeout", "helm_bin", "terraform_bin", "state_dir"];

/// Errors that can occur when reading or changing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write config {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("failed to parse config {}: {source}", path.display())]
  Parse { path: PathBuf, source: toml::de::Error },

  #[error("failed to serialize config: {0}")]
  Serialize(#[from] toml::ser::Error),

  #[error("unknown config key: {0} (expected one of: {keys})", keys = KEYS.join(", "))]
  UnknownKey(String),

  #[error("invalid value for {key}: {message}")]
  InvalidValue { key: String, message: String },

  #[error("config file already exists: {} (use --force to overwrite)", path.display())]
  Exists { path: PathBuf },
}

/// Persisted CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Maximum number of installations operated on at once.
  pub parallelism: usize,

  /// Per-operation timeout, humantime syntax. `0s` disables it.
  pub timeout: String,

  pub helm_bin: String,

  pub terraform_bin: String,

  /// Override for the run-state directory.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state_dir: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    let tools = Toolchain::default();
    Self {
      parallelism: DEFAULT_PARALLELISM,
      timeout: humantime::format_duration(DEFAULT_TIMEOUT).to_string(),
      helm_bin: tools.helm,
      terraform_bin: tools.terraform,
      state_dir: None,
    }
  }
}

impl Config {
  /// Location of the config file, honoring `CHARTMART_CONFIG`.
  pub fn default_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
      Some(path) if !path.is_empty() => PathBuf::from(path),
      _ => config_dir().join(CONFIG_FILENAME),
    }
  }

  /// Load from the default location.
  pub fn load_default() -> Result<Self, ConfigError> {
    Self::load(&Self::default_path())
  }

  /// Load from `path`. A missing file yields defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(ConfigError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Parse TOML text without touching the filesystem.
  pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }

  /// Write to `path`, creating parent directories.
  ///
  /// Uses atomic write (write to temp, then rename).
  pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(self)?;

    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let temp_path = path.with_extension("toml.tmp");
    fs::write(&temp_path, content).map_err(|source| ConfigError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| ConfigError::Write {
      path: path.to_path_buf(),
      source,
    })?;

    info!(path = %path.display(), "config saved");
    Ok(())
  }

  /// Check values that TOML typing alone does not constrain.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.parallelism == 0 {
      return Err(invalid("parallelism", "must be at least 1"));
    }
    parse_timeout(&self.timeout)?;
    if self.helm_bin.trim().is_empty() {
      return Err(invalid("helm_bin", "must not be empty"));
    }
    if self.terraform_bin.trim().is_empty() {
      return Err(invalid("terraform_bin", "must not be empty"));
    }
    Ok(())
  }

  /// Current value of `key` as a display string.
  pub fn get(&self, key: &str) -> Result<String, ConfigError> {
    Ok(match key {
      "parallelism" => self.parallelism.to_string(),
      "timeout" => self.timeout.clone(),
      "helm_bin" => self.helm_bin.clone(),
      "terraform_bin" => self.terraform_bin.clone(),
      "state_dir" => self
        .state_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default(),
      other => return Err(ConfigError::UnknownKey(other.to_string())),
    })
  }

  /// Set `key` from a string, validating the new value.
  ///
  /// An empty `state_dir` clears the override.
  pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
    let mut next = self.clone();
    match key {
      "parallelism" => {
        next.parallelism = value
          .trim()
          .parse()
          .map_err(|e| invalid("parallelism", &format!("{}", e)))?;
      }
      "timeout" => next.timeout = value.trim().to_string(),
      "helm_bin" => next.helm_bin = value.to_string(),
      "terraform_bin" => next.terraform_bin = value.to_string(),
      "state_dir" => {
        next.state_dir = if value.trim().is_empty() {
          None
        } else {
          Some(PathBuf::from(value))
        };
      }
      other => return Err(ConfigError::UnknownKey(other.to_string())),
    }
    next.validate()?;
    *self = next;
    Ok(())
  }

  /// All keys with their current values, in display order.
  pub fn list(&self) -> Vec<(&'static str, String)> {
    KEYS
      .iter()
      .map(|key| (*key, self.get(key).unwrap_or_default()))
      .collect()
  }

  /// Per-operation timeout, `None` when disabled.
  pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
    parse_timeout(&self.timeout)
  }

  pub fn execute_config(&self) -> Result<ExecuteConfig, ConfigError> {
    Ok(ExecuteConfig {
      parallelism: self.parallelism,
      timeout: self.timeout()?,
    })
  }

  pub fn toolchain(&self) -> Toolchain {
    Toolchain {
      helm: self.helm_bin.clone(),
      terraform: self.terraform_bin.clone(),
    }
  }

  pub fn state_store(&self) -> StateStore {
    match &self.state_dir {
      Some(dir) => StateStore::new(dir.clone()),
      None => StateStore::default_location(),
    }
  }
}

/// Parse a humantime duration; zero disables the timeout.
pub fn parse_timeout(value: &str) -> Result<Option<Duration>, ConfigError> {
  let duration = humantime::parse_duration(value.trim()).map_err(|e| invalid("timeout", &e.to_string()))?;
  Ok(if duration.is_zero() { None } else { Some(duration) })
}

fn invalid(key: &str, message: &str) -> ConfigError {
  ConfigError::InvalidValue {
    key: key.to_string(),
    message: message.to_string(),
  }
}

/// Write a default config to `path`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<Config, ConfigError> {
  if path.exists() && !force {
    return Err(ConfigError::Exists {
      path: path.to_path_buf(),
    });
  }
  let config = Config::default();
  config.save(path)?;
  Ok(config)
}

/// Validate the config at `source` and install it at `dest`.
pub fn import_config(source: &Path, dest: &Path) -> Result<Config, ConfigError> {
  let content = fs::read_to_string(source).map_err(|e| ConfigError::Read {
    path: source.to_path_buf(),
    source: e,
  })?;
  let config = Config::parse(&content).map_err(|e| ConfigError::Parse {
    path: source.to_path_buf(),
    source: e,
  })?;
  config.validate()?;
  config.save(dest)?;
  info!(from = %source.display(), to = %dest.display(), "config imported");
  Ok(config)
}
