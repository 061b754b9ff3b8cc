//! Interactive confirmation for destructive commands.

use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask a yes/no question on stderr.
///
/// `force` answers yes without asking. Without a terminal there is nobody to
/// ask, so the caller must pass `--force`.
pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --force to proceed.");
  }

  read_answer(message, &mut io::stdin().lock(), &mut io::stderr())
}

fn read_answer(message: &str, input: &mut impl BufRead, prompt: &mut impl Write) -> Result<bool> {
  write!(prompt, "{} [y/N] ", message)?;
  prompt.flush()?;

  let mut answer = String::new();
  input.read_line(&mut answer)?;

  Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
