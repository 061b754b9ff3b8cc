//! Workspace manifest loading.
//!
//! A workspace is a directory holding `workspace.yaml`. Loading it yields the
//! validated installation set the orchestrator runs over; graph-level checks
//! (unknown dependencies, cycles) happen later when the graph is built.

mod types;
mod values;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::WORKSPACE_MANIFEST;
use crate::installation::{Installation, ValidationError};

pub use types::{InstallationSpec, WorkspaceManifest};
pub use values::{ValuesError, check_values_file};

/// Errors that can occur when loading a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
  #[error("workspace manifest not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read workspace manifest {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse workspace manifest {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_yaml::Error },

  #[error("invalid installation in {}: {source}", path.display())]
  Invalid { path: PathBuf, source: ValidationError },
}

/// A loaded workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
  pub name: String,
  /// Directory containing the manifest. Installation paths are resolved against it.
  pub root: PathBuf,
  pub installations: Vec<Installation>,
}

impl Workspace {
  /// Build a workspace from an already-parsed manifest.
  ///
  /// Relative installation paths are joined onto `root`.
  pub fn from_manifest(manifest: WorkspaceManifest, root: &Path) -> Result<Self, ValidationError> {
    let name = manifest
      .name
      .filter(|n| !n.trim().is_empty())
      .unwrap_or_else(|| default_name(root));

    let installations = manifest
      .installations
      .into_iter()
      .map(|spec| installation_from_spec(spec, root))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      name,
      root: root.to_path_buf(),
      installations,
    })
  }
}

fn installation_from_spec(spec: InstallationSpec, root: &Path) -> Result<Installation, ValidationError> {
  let path = root.join(spec.path.unwrap_or_else(|| PathBuf::from(&spec.id)));
  let mut installation = Installation::parse(spec.id, &spec.kind)?
    .with_dependencies(spec.depends_on)?
    .with_path(path);
  if let Some(namespace) = spec.namespace {
    installation = installation.with_namespace(namespace);
  }
  Ok(installation)
}

fn default_name(root: &Path) -> String {
  root
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "default".to_string())
}

/// Parse manifest text.
pub fn parse_manifest(content: &str) -> Result<WorkspaceManifest, serde_yaml::Error> {
  // An empty file is an empty workspace
  if content.trim().is_empty() {
    return Ok(WorkspaceManifest::default());
  }
  serde_yaml::from_str(content)
}

/// Load the workspace in `dir`.
///
/// # Errors
///
/// - `NotFound` if `dir` has no `workspace.yaml`.
/// - `Parse` for malformed YAML or unknown fields.
/// - `Invalid` for an empty id, empty dependency id, or unknown kind.
pub fn load_workspace(dir: &Path) -> Result<Workspace, WorkspaceError> {
  let root = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
  let path = root.join(WORKSPACE_MANIFEST);

  debug!(path = %path.display(), "loading workspace manifest");

  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(WorkspaceError::NotFound { path }),
    Err(source) => return Err(WorkspaceError::Read { path, source }),
  };

  let manifest = parse_manifest(&content).map_err(|source| WorkspaceError::Parse {
    path: path.clone(),
    source,
  })?;

  let workspace =
    Workspace::from_manifest(manifest, &root).map_err(|source| WorkspaceError::Invalid { path, source })?;

  info!(
    workspace = %workspace.name,
    installations = workspace.installations.len(),
    "workspace loaded"
  );

  Ok(workspace)
}
