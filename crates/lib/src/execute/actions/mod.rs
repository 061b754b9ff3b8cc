//! Action dispatch for external tools.
//!
//! Maps an (operation, installation) pair onto the `helm` or `terraform`
//! command line that carries it out.

pub mod cmd;

use crate::execute::types::Operation;
use crate::installation::{Installation, InstallationKind};

pub use cmd::{ToolInvocation, execute_cmd, require_dir};

/// Executables used for each installation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
  pub helm: String,
  pub terraform: String,
}

impl Default for Toolchain {
  fn default() -> Self {
    Self {
      helm: "helm".to_string(),
      terraform: "terraform".to_string(),
    }
  }
}

/// Build the tool invocation for one operation on one installation.
///
/// Charts are released under the installation id in the installation's
/// namespace. Terraform modules run inside their source directory, so each
/// module keeps its own state.
pub fn invocation_for(operation: Operation, installation: &Installation, tools: &Toolchain) -> ToolInvocation {
  let path = installation.path().display().to_string();
  let release = installation.id().as_str();
  let namespace = installation.namespace();

  match installation.kind() {
    InstallationKind::Chart => {
      let helm = ToolInvocation::new(&tools.helm);
      match operation {
        Operation::Build => helm.args(["dependency", "build", &path]),
        Operation::Validate => helm.args(["template", release, &path, "--namespace", namespace]),
        Operation::Deploy => helm.args([
          "upgrade",
          "--install",
          release,
          &path,
          "--namespace",
          namespace,
          "--create-namespace",
          "--wait",
        ]),
        Operation::Destroy => helm.args(["uninstall", release, "--namespace", namespace, "--ignore-not-found"]),
      }
    }
    InstallationKind::Terraform => {
      let terraform = ToolInvocation::new(&tools.terraform).in_dir(installation.path());
      match operation {
        Operation::Build => terraform.args(["init", "-input=false"]),
        Operation::Validate => terraform.arg("validate"),
        Operation::Deploy => terraform.args(["apply", "-auto-approve", "-input=false"]),
        Operation::Destroy => terraform.args(["destroy", "-auto-approve", "-input=false"]),
      }
    }
  }
}
