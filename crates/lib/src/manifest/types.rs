//! On-disk shape of `workspace.yaml`.
//!
//! ```yaml
//! name: prod
//! installations:
//!   - id: postgres
//!     kind: chart
//!     path: charts/postgres
//!     namespace: data
//!     depends_on: [network]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The parsed workspace manifest, before validation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceManifest {
  /// Workspace name. Defaults to the workspace directory name.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,

  #[serde(default)]
  pub installations: Vec<InstallationSpec>,
}

/// One entry under `installations:`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallationSpec {
  pub id: String,

  /// `chart` or `terraform` (aliases: `helm`, `terraform_module`).
  pub kind: String,

  /// Chart or module directory, relative to the workspace directory.
  /// Defaults to the id.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<PathBuf>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub namespace: Option<String>,

  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,
}
