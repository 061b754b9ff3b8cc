//! Command execution for external deployment tools.
//!
//! Runs `helm` / `terraform` as child processes, capturing their output so a
//! failure can be reported with the tool's own diagnostics.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::types::OperationError;

/// Maximum number of stderr lines carried in an error.
const STDERR_TAIL_LINES: usize = 20;

/// A fully resolved external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
  /// Program to run (looked up on `PATH` unless absolute).
  pub program: String,
  /// Arguments, passed without a shell.
  pub args: Vec<String>,
  /// Working directory, if the tool must run inside the source tree.
  pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  /// Human-readable command line for logs and errors.
  pub fn display(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Execute a tool invocation.
///
/// The child inherits the caller's environment (kubeconfig, cloud credentials)
/// and is killed if the returned future is dropped, which is how a timeout
/// stops it. On unix it runs in its own process group, so a terminal Ctrl-C
/// reaches only chartmart and the tool is left to finish.
///
/// # Returns
///
/// The stdout of the command on success (trimmed).
pub async fn execute_cmd(invocation: &ToolInvocation) -> Result<String, OperationError> {
  let command_line = invocation.display();
  info!(cmd = %command_line, "executing command");

  let mut command = Command::new(&invocation.program);
  command.args(&invocation.args).kill_on_drop(true);

  #[cfg(unix)]
  command.process_group(0);

  if let Some(cwd) = &invocation.cwd {
    command.current_dir(cwd);
  }

  debug!(cwd = ?invocation.cwd, "spawning process");

  let output = command.output().await.map_err(|e| OperationError::Spawn {
    command: command_line.clone(),
    message: e.to_string(),
  })?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(OperationError::CommandFailed {
      command: command_line,
      code: output.status.code(),
      stderr: tail(&stderr, STDERR_TAIL_LINES),
    });
  }

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Check that a source directory exists before handing it to a tool.
pub fn require_dir(path: &Path) -> Result<(), OperationError> {
  if path.is_dir() {
    Ok(())
  } else {
    Err(OperationError::MissingSource(path.display().to_string()))
  }
}

/// Last `n` non-empty lines of `text`.
fn tail(text: &str, n: usize) -> String {
  let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
  let start = lines.len().saturating_sub(n);
  lines[start..].join("\n")
}
