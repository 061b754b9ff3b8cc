//! Lifecycle execution module.
//!
//! This module provides the orchestrator that drives installations through
//! build, validate, deploy, bounce, and destroy. It handles:
//! - Dependency graph validation and wave planning
//! - Bounded parallel execution within each wave
//! - Failure propagation (skip dependents on build/deploy, block dependencies on destroy)
//! - Cooperative cancellation between waves and per-operation timeouts

pub mod actions;
pub mod dag;
pub mod operator;
pub mod plan;
pub mod scope;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::installation::{Installation, InstallationId, InstallationState, LastResult};

pub use actions::Toolchain;
pub use dag::DependencyGraph;
pub use operator::{Operator, ToolingOperator, invoke};
pub use plan::{ExecutionPlan, PlanDirection, topological_order};
pub use scope::{Scope, ScopeDirection};
pub use types::{
  Cancellation, ExecuteConfig, InstallationReport, ManifestError, Operation, OperationError, Outcome, RunError,
  RunKind, RunReport, ScopeError,
};

/// Results of one wave step, keyed by installation.
type WaveResults = Vec<(InstallationId, Result<String, OperationError>)>;

/// Compute the deterministic topological order of a set of installations
/// without executing anything.
pub fn topsort(installations: &[Installation]) -> Result<Vec<InstallationId>, ManifestError> {
  let graph = DependencyGraph::build(installations)?;
  Ok(topological_order(&graph))
}

/// Drives installations through their lifecycle, wave by wave.
///
/// The orchestrator owns every state transition. Graph construction and
/// planning are pure; all side effects go through the [`Operator`].
pub struct Orchestrator<O: Operator> {
  operator: Arc<O>,
  config: ExecuteConfig,
  cancellation: Cancellation,
  run_id: String,
}

impl<O: Operator> Orchestrator<O> {
  pub fn new(operator: O, config: ExecuteConfig) -> Self {
    Self {
      operator: Arc::new(operator),
      config,
      cancellation: Cancellation::new(),
      run_id: String::from("local"),
    }
  }

  /// Share a cancellation handle with the caller (e.g. a Ctrl-C handler).
  pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
    self.cancellation = cancellation;
    self
  }

  /// Tag reports produced by this orchestrator with `run_id`.
  pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
    self.run_id = run_id.into();
    self
  }

  pub fn operator(&self) -> &O {
    &self.operator
  }

  pub fn config(&self) -> &ExecuteConfig {
    &self.config
  }

  pub fn cancellation(&self) -> &Cancellation {
    &self.cancellation
  }

  /// Build the installations in `only` and everything they depend on.
  ///
  /// An empty `only` builds the whole workspace.
  pub async fn build(&self, installations: &mut [Installation], only: &[InstallationId]) -> Result<RunReport, RunError> {
    self.run(RunKind::Build, installations, only).await
  }

  /// Validate the installations in `only` (closed over dependencies) without
  /// touching the cluster.
  pub async fn validate(
    &self,
    installations: &mut [Installation],
    only: &[InstallationId],
  ) -> Result<RunReport, RunError> {
    self.run(RunKind::Validate, installations, only).await
  }

  /// Build and deploy the whole workspace in dependency order.
  pub async fn deploy(&self, installations: &mut [Installation]) -> Result<RunReport, RunError> {
    self.run(RunKind::Deploy, installations, &[]).await
  }

  /// Redeploy the whole workspace, including installations already deployed.
  pub async fn bounce(&self, installations: &mut [Installation]) -> Result<RunReport, RunError> {
    let previously_deployed = installations
      .iter()
      .filter(|i| matches!(i.state(), InstallationState::Deployed | InstallationState::Failed))
      .count();
    info!(previously_deployed, total = installations.len(), "bouncing workspace");
    self.run(RunKind::Bounce, installations, &[]).await
  }

  /// Tear down the whole workspace, dependents before dependencies.
  pub async fn destroy(&self, installations: &mut [Installation]) -> Result<RunReport, RunError> {
    self.run(RunKind::Destroy, installations, &[]).await
  }

  async fn run(
    &self,
    kind: RunKind,
    installations: &mut [Installation],
    only: &[InstallationId],
  ) -> Result<RunReport, RunError> {
    // Everything fatal is detected before any external operation runs
    let graph = DependencyGraph::build(installations)?;
    let scope = if only.is_empty() {
      Scope::all(&graph)
    } else {
      Scope::resolve(&graph, only.iter().map(|id| id.0.clone()), ScopeDirection::Dependencies)?
    };

    let forward = ExecutionPlan::for_scope(&graph, &scope);
    let plan = match kind {
      RunKind::Destroy => forward.reverse(),
      _ => forward,
    };

    info!(
      run = %self.run_id,
      command = %kind,
      installations = plan.installation_count(),
      waves = plan.len(),
      parallelism = self.config.parallelism,
      "starting run"
    );

    let mut roster = Roster::new(installations);
    let mut ledger = Ledger::default();
    let semaphore = Arc::new(Semaphore::new(self.config.parallelism.max(1)));

    'waves: for (wave_idx, wave) in plan.waves().iter().enumerate() {
      if self.cancellation.is_cancelled() {
        warn!(wave = wave_idx, "run cancelled, not admitting further waves");
        break;
      }

      debug!(wave = wave_idx, installations = wave.len(), "executing wave");

      let mut ready = Vec::new();
      for id in wave {
        if kind == RunKind::Destroy {
          // A dependency stays up while any dependent failed to come down
          if let Some(dependent) = graph.dependents(id).into_iter().find(|d| ledger.unsuccessful.contains(*d)) {
            warn!(installation = %id, dependent = %dependent, "not destroying installation while a dependent remains");
            ledger.block(id, dependent);
            continue;
          }
        } else if let Some(dep) = graph
          .dependencies(id)
          .into_iter()
          .find(|d| ledger.unsuccessful.contains(*d))
        {
          warn!(installation = %id, failed_dep = %dep, "skipping installation due to failed dependency");
          ledger.skip(id, dep);
          continue;
        }
        ready.push(id.clone());
      }

      for (step, &operation) in kind.operations().iter().enumerate() {
        if ready.is_empty() {
          break;
        }
        if step > 0 && self.cancellation.is_cancelled() {
          warn!(wave = wave_idx, %operation, "run cancelled between steps");
          break 'waves;
        }

        let results = self.execute_wave(operation, &ready, &mut roster, &semaphore).await?;
        ready = ledger.settle(operation, results, &mut roster)?;
      }

      for id in ready {
        ledger.succeed(id);
      }
    }

    let report = ledger.into_report(&self.run_id, kind, &plan, &roster);

    info!(
      run = %self.run_id,
      command = %kind,
      succeeded = report.succeeded(),
      failed = report.failed(),
      skipped = report.skipped(),
      blocked = report.blocked(),
      cancelled = report.cancelled(),
      "run complete"
    );

    Ok(report)
  }

  /// Run one operation for every id in `ids` in parallel, bounded by `semaphore`.
  ///
  /// Returns only when every worker has finished.
  async fn execute_wave(
    &self,
    operation: Operation,
    ids: &[InstallationId],
    roster: &mut Roster<'_>,
    semaphore: &Arc<Semaphore>,
  ) -> Result<WaveResults, RunError> {
    let mut join_set = JoinSet::new();

    for id in ids {
      let installation = roster.get_mut(id);
      installation.transition(operation.running_state())?;
      info!(installation = %id, %operation, "starting operation");

      let installation = installation.clone();
      let operator = Arc::clone(&self.operator);
      let semaphore = Arc::clone(semaphore);
      let timeout = self.config.timeout;

      join_set.spawn(async move {
        let result = match semaphore.acquire_owned().await {
          Ok(_permit) => run_with_timeout(operator.as_ref(), operation, &installation, timeout).await,
          Err(_) => Err(OperationError::Aborted("worker pool closed".to_string())),
        };
        (installation.id().clone(), result)
      });
    }

    Ok(collect_join_results(join_set, ids, operation).await)
  }
}

/// Invoke the operator, failing with `Timeout` if `timeout` elapses first.
async fn run_with_timeout<O: Operator>(
  operator: &O,
  operation: Operation,
  installation: &Installation,
  timeout: Option<Duration>,
) -> Result<String, OperationError> {
  let Some(after) = timeout else {
    return invoke(operator, operation, installation).await;
  };

  match tokio::time::timeout(after, invoke(operator, operation, installation)).await {
    Ok(result) => result,
    Err(_) => Err(OperationError::Timeout { operation, after }),
  }
}

/// Collect results from a JoinSet of workers.
///
/// A worker that panicked never reports; its installation is failed with
/// `Aborted` so the wave still settles every id.
async fn collect_join_results(
  mut join_set: JoinSet<(InstallationId, Result<String, OperationError>)>,
  ids: &[InstallationId],
  operation: Operation,
) -> WaveResults {
  let mut results = Vec::new();

  while let Some(join_result) = join_set.join_next().await {
    match join_result {
      Ok(result) => results.push(result),
      Err(e) => {
        error!(error = %e, %operation, "worker task panicked");
      }
    }
  }

  let reported: HashSet<InstallationId> = results.iter().map(|(id, _)| id.clone()).collect();
  for id in ids {
    if !reported.contains(id) {
      results.push((
        id.clone(),
        Err(OperationError::Aborted(format!("{} worker for {} terminated unexpectedly", operation, id))),
      ));
    }
  }

  results.sort_by(|a, b| a.0.cmp(&b.0));
  results
}

/// Mutable view of the run's installations, addressable by id.
struct Roster<'a> {
  installations: &'a mut [Installation],
  index: HashMap<InstallationId, usize>,
}

impl<'a> Roster<'a> {
  fn new(installations: &'a mut [Installation]) -> Self {
    let index = installations
      .iter()
      .enumerate()
      .map(|(i, inst)| (inst.id().clone(), i))
      .collect();
    Self { installations, index }
  }

  fn get(&self, id: &InstallationId) -> &Installation {
    &self.installations[self.index[id]]
  }

  fn get_mut(&mut self, id: &InstallationId) -> &mut Installation {
    &mut self.installations[self.index[id]]
  }
}

/// Per-run bookkeeping of outcomes.
#[derive(Default)]
struct Ledger {
  outcomes: HashMap<InstallationId, Outcome>,
  messages: HashMap<InstallationId, String>,
  /// Installations that did not succeed (failed, skipped, or blocked).
  unsuccessful: HashSet<InstallationId>,
}

impl Ledger {
  fn skip(&mut self, id: &InstallationId, failed_dependency: &InstallationId) {
    self.unsuccessful.insert(id.clone());
    self.outcomes.insert(
      id.clone(),
      Outcome::Skipped {
        failed_dependency: failed_dependency.clone(),
      },
    );
  }

  fn block(&mut self, id: &InstallationId, dependent: &InstallationId) {
    self.unsuccessful.insert(id.clone());
    self.outcomes.insert(
      id.clone(),
      Outcome::Blocked {
        dependent: dependent.clone(),
      },
    );
  }

  fn succeed(&mut self, id: InstallationId) {
    self.outcomes.insert(id, Outcome::Succeeded);
  }

  /// Apply a wave step's results to the installations.
  ///
  /// Returns the ids that succeeded, which proceed to the next step.
  fn settle(
    &mut self,
    operation: Operation,
    results: WaveResults,
    roster: &mut Roster<'_>,
  ) -> Result<Vec<InstallationId>, RunError> {
    let mut succeeded = Vec::new();

    for (id, result) in results {
      let installation = roster.get_mut(&id);
      match result {
        Ok(output) => {
          installation.transition(operation.success_state())?;
          info!(installation = %id, %operation, "operation succeeded");
          let message = if output.is_empty() {
            format!("{} succeeded", operation)
          } else {
            output.clone()
          };
          installation.record(LastResult::success(message));
          if !output.is_empty() {
            self.messages.insert(id.clone(), output);
          }
          succeeded.push(id);
        }
        Err(e) => {
          error!(installation = %id, %operation, error = %e, "operation failed");
          installation.transition(InstallationState::Failed)?;
          installation.record(LastResult::failure(e.to_string()));
          self.unsuccessful.insert(id.clone());
          self.outcomes.insert(id, Outcome::Failed(e));
        }
      }
    }

    Ok(succeeded)
  }

  /// Assemble the report in plan order. Installations with no recorded
  /// outcome were never admitted because the run was cancelled.
  fn into_report(mut self, run_id: &str, kind: RunKind, plan: &ExecutionPlan, roster: &Roster<'_>) -> RunReport {
    let mut report = RunReport::new(run_id, kind);
    for id in plan.flatten() {
      let outcome = self.outcomes.remove(&id).unwrap_or(Outcome::Cancelled);
      report.entries.push(InstallationReport {
        state: roster.get(&id).state(),
        message: self.messages.remove(&id),
        outcome,
        id,
      });
    }
    report
  }
}
