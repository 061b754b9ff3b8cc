//! Shared driver for lifecycle commands.
//!
//! Loads configuration and the workspace, seeds installation states from the
//! run-state store, runs the orchestrator with Ctrl-C wired to cancellation,
//! persists the outcome, and prints the report.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use rand::Rng;
use tracing::{info, warn};

use chartmart_lib::config::Config;
use chartmart_lib::execute::{Cancellation, ExecuteConfig, Orchestrator, RunKind, RunReport, ToolingOperator};
use chartmart_lib::installation::InstallationId;
use chartmart_lib::manifest::load_workspace;
use chartmart_lib::util::run_id::generate_run_id;

use crate::output::{OutputFormat, print_report, summary_line};

/// Command-line overrides for a lifecycle run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  pub parallelism: Option<usize>,
  pub timeout: Option<Duration>,
  pub output: OutputFormat,
}

impl RunOptions {
  /// Apply overrides on top of the configured execution settings.
  fn apply(&self, mut execute: ExecuteConfig) -> Result<ExecuteConfig> {
    if let Some(parallelism) = self.parallelism {
      if parallelism == 0 {
        bail!("--parallelism must be at least 1");
      }
      execute.parallelism = parallelism;
    }
    if let Some(timeout) = self.timeout {
      execute.timeout = if timeout.is_zero() { None } else { Some(timeout) };
    }
    Ok(execute)
  }
}

/// Run one lifecycle command against the workspace in `dir`.
///
/// Returns an error after printing the report if any installation did not
/// succeed, so the process exits non-zero.
pub fn run_lifecycle<R: Rng>(kind: RunKind, dir: &Path, only: &[String], options: &RunOptions, rng: &mut R) -> Result<()> {
  let config = Config::load_default().context("Failed to load config")?;
  let execute = options.apply(config.execute_config()?)?;

  let workspace = load_workspace(dir).context("Failed to load workspace")?;
  let store = config.state_store();
  let mut state = store.load(&workspace.name).context("Failed to load run state")?;
  let mut installations = state.seed(workspace.installations);

  let run_id = generate_run_id(rng);
  let cancellation = Cancellation::new();
  let orchestrator = Orchestrator::new(ToolingOperator::new(config.toolchain()), execute)
    .with_cancellation(cancellation.clone())
    .with_run_id(run_id.as_str());
  let only: Vec<InstallationId> = only.iter().map(|id| InstallationId::from(id.as_str())).collect();

  info!(run = %run_id, command = %kind, workspace = %workspace.name, "run starting");
  let started = Instant::now();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report: RunReport = rt
    .block_on(async {
      let interrupt = cancellation.clone();
      let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupt received, waiting for running operations to finish");
          interrupt.cancel();
        }
      });

      let result = match kind {
        RunKind::Build => orchestrator.build(&mut installations, &only).await,
        RunKind::Validate => orchestrator.validate(&mut installations, &only).await,
        RunKind::Deploy => orchestrator.deploy(&mut installations).await,
        RunKind::Bounce => orchestrator.bounce(&mut installations).await,
        RunKind::Destroy => orchestrator.destroy(&mut installations).await,
      };

      watcher.abort();
      result
    })
    .with_context(|| format!("{} failed", kind))?;

  let elapsed = started.elapsed();

  state.record_run(&report, &installations);
  store.save(&state).context("Failed to save run state")?;

  print_report(&report, elapsed, options.output)?;

  if !report.is_success() {
    bail!("{} did not complete: {}", kind, summary_line(&report));
  }
  Ok(())
}
