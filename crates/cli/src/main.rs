mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use chartmart_lib::consts::LOG_ENV;
use chartmart_lib::execute::RunKind;

use crate::cmd::RunOptions;
use crate::output::OutputFormat;

/// chartmart - Orchestrate Helm charts and Terraform modules as one dependency graph
#[derive(Parser)]
#[command(name = "chartmart")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

/// Execution overrides shared by lifecycle commands.
#[derive(Args, Debug, Default)]
struct ExecArgs {
  /// Maximum number of installations operated on at once
  #[arg(long)]
  parallelism: Option<usize>,

  /// Per-operation timeout (e.g. 10m, 90s; 0s disables)
  #[arg(long, value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build installations (and everything they depend on)
  Build {
    /// Workspace directory containing workspace.yaml
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Only build these installations plus their dependencies
    #[arg(long = "only", value_name = "ID")]
    only: Vec<String>,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Validate installations without touching the cluster
  #[command(visible_alias = "v")]
  Validate {
    /// Workspace directory containing workspace.yaml
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Only validate these installations plus their dependencies
    #[arg(long = "only", value_name = "ID")]
    only: Vec<String>,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Print installations in dependency order
  Topsort {
    /// Workspace directory containing workspace.yaml
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,
  },

  /// Build and deploy a workspace in dependency order
  Deploy {
    /// Workspace directory
    wkspace: PathBuf,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Redeploy every installation of a workspace
  Bounce {
    /// Workspace directory
    wkspace: PathBuf,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Tear down a workspace, dependents first
  Destroy {
    /// Workspace directory
    wkspace: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Show the recorded state of a workspace
  Status {
    /// Workspace directory
    wkspace: PathBuf,
  },

  /// Write a default config file
  Init {
    /// Overwrite an existing config file
    #[arg(short, long)]
    force: bool,
  },

  /// Validate a config file and install it as the active config
  Import {
    /// Config file to import
    file: PathBuf,
  },

  /// Check that a chart values file is a YAML mapping
  Test {
    /// Values file to check
    file: PathBuf,
  },

  /// Read or change configuration
  #[command(visible_alias = "conf")]
  Config {
    #[command(subcommand)]
    action: ConfigAction,
  },
}

#[derive(Subcommand)]
enum ConfigAction {
  /// Print one setting
  Get { key: String },

  /// Change one setting
  Set { key: String, value: String },

  /// Print every setting
  List,

  /// Print the config file location
  Path,
}

fn init_tracing(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_env(LOG_ENV)
      .or_else(|_| EnvFilter::try_from_default_env())
      .unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run_options(exec: ExecArgs, output: OutputFormat) -> RunOptions {
  RunOptions {
    parallelism: exec.parallelism,
    timeout: exec.timeout,
    output,
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  // One generator per process, threaded to whatever needs randomness
  let mut rng = StdRng::from_entropy();
  let output = cli.output;

  match cli.command {
    Commands::Build { workspace, only, exec } => {
      cmd::cmd_build(RunKind::Build, &workspace, &only, &run_options(exec, output), &mut rng)
    }
    Commands::Validate { workspace, only, exec } => {
      cmd::cmd_build(RunKind::Validate, &workspace, &only, &run_options(exec, output), &mut rng)
    }
    Commands::Topsort { workspace } => cmd::cmd_topsort(&workspace, output),
    Commands::Deploy { wkspace, exec } => {
      cmd::cmd_deploy(RunKind::Deploy, &wkspace, &run_options(exec, output), &mut rng)
    }
    Commands::Bounce { wkspace, exec } => {
      cmd::cmd_deploy(RunKind::Bounce, &wkspace, &run_options(exec, output), &mut rng)
    }
    Commands::Destroy { wkspace, force, exec } => {
      cmd::cmd_destroy(&wkspace, force, &run_options(exec, output), &mut rng)
    }
    Commands::Status { wkspace } => cmd::cmd_status(&wkspace, cli.verbose, output),
    Commands::Init { force } => cmd::cmd_init(force),
    Commands::Import { file } => cmd::cmd_import(&file),
    Commands::Test { file } => cmd::cmd_test(&file, output),
    Commands::Config { action } => match action {
      ConfigAction::Get { key } => cmd::cmd_config_get(&key),
      ConfigAction::Set { key, value } => cmd::cmd_config_set(&key, &value),
      ConfigAction::List => cmd::cmd_config_list(output),
      ConfigAction::Path => cmd::cmd_config_path(),
    },
  }
}
