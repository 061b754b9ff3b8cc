//! The boundary between the orchestrator and the deployment tools.
//!
//! The orchestrator never renders charts or applies Terraform itself; it calls an
//! [`Operator`] and only looks at whether each step succeeded.

use std::future::Future;

use tracing::debug;

use crate::installation::Installation;

use super::actions::{Toolchain, execute_cmd, invocation_for, require_dir};
use super::types::{Operation, OperationError};

/// External build, validate, deploy, and destroy steps for installations.
///
/// Each method returns the tool's output on success. Implementations must be
/// safe to call concurrently for different installations; the orchestrator never
/// runs two operations on the same installation at once.
pub trait Operator: Send + Sync + 'static {
  /// Render and prepare the installation (dependency fetch, template rendering).
  fn build(&self, installation: &Installation) -> impl Future<Output = Result<String, OperationError>> + Send;

  /// Check the installation without touching the cluster.
  fn validate(&self, installation: &Installation) -> impl Future<Output = Result<String, OperationError>> + Send;

  /// Apply the installation to the cluster.
  fn deploy(&self, installation: &Installation) -> impl Future<Output = Result<String, OperationError>> + Send;

  /// Remove the installation's release or state from the cluster.
  fn destroy(&self, installation: &Installation) -> impl Future<Output = Result<String, OperationError>> + Send;
}

/// Run `operation` on `installation` through `operator`.
pub async fn invoke<O: Operator>(
  operator: &O,
  operation: Operation,
  installation: &Installation,
) -> Result<String, OperationError> {
  match operation {
    Operation::Build => operator.build(installation).await,
    Operation::Validate => operator.validate(installation).await,
    Operation::Deploy => operator.deploy(installation).await,
    Operation::Destroy => operator.destroy(installation).await,
  }
}

/// [`Operator`] backed by the `helm` and `terraform` command-line tools.
#[derive(Debug, Clone, Default)]
pub struct ToolingOperator {
  tools: Toolchain,
}

impl ToolingOperator {
  pub fn new(tools: Toolchain) -> Self {
    Self { tools }
  }

  pub fn tools(&self) -> &Toolchain {
    &self.tools
  }

  async fn run(&self, operation: Operation, installation: &Installation) -> Result<String, OperationError> {
    require_dir(installation.path())?;
    let invocation = invocation_for(operation, installation, &self.tools);
    debug!(
      installation = %installation.id(),
      kind = %installation.kind(),
      %operation,
      "invoking tool"
    );
    execute_cmd(&invocation).await
  }
}

impl Operator for ToolingOperator {
  async fn build(&self, installation: &Installation) -> Result<String, OperationError> {
    self.run(Operation::Build, installation).await
  }

  async fn validate(&self, installation: &Installation) -> Result<String, OperationError> {
    self.run(Operation::Validate, installation).await
  }

  async fn deploy(&self, installation: &Installation) -> Result<String, OperationError> {
    self.run(Operation::Deploy, installation).await
  }

  async fn destroy(&self, installation: &Installation) -> Result<String, OperationError> {
    self.run(Operation::Destroy, installation).await
  }
}
