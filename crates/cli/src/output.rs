//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, run reports, and Unicode symbols.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use chartmart_lib::execute::{Outcome, RunReport};
use chartmart_lib::installation::InstallationState;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIP: &str = "-";
  pub const BLOCKED: &str = "‖";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// JSON shape of a run report.
#[derive(Debug, Serialize)]
pub struct ReportJson<'a> {
  pub run_id: &'a str,
  pub command: &'static str,
  pub success: bool,
  pub elapsed_ms: u128,
  pub entries: Vec<EntryJson<'a>>,
}

#[derive(Debug, Serialize)]
pub struct EntryJson<'a> {
  pub id: &'a str,
  pub state: InstallationState,
  pub outcome: &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<&'a str>,
}

impl<'a> ReportJson<'a> {
  pub fn new(report: &'a RunReport, elapsed: Duration) -> Self {
    Self {
      run_id: &report.run_id,
      command: report.kind.as_str(),
      success: report.is_success(),
      elapsed_ms: elapsed.as_millis(),
      entries: report
        .entries
        .iter()
        .map(|e| EntryJson {
          id: e.id.as_str(),
          state: e.state,
          outcome: e.outcome.label(),
          detail: outcome_detail(&e.outcome),
          message: e.message.as_deref(),
        })
        .collect(),
    }
  }
}

/// Explanation for a non-success outcome.
fn outcome_detail(outcome: &Outcome) -> Option<String> {
  match outcome {
    Outcome::Succeeded | Outcome::Cancelled => None,
    Outcome::Failed(e) => Some(e.to_string()),
    Outcome::Skipped { failed_dependency } => Some(format!("dependency {} did not succeed", failed_dependency)),
    Outcome::Blocked { dependent } => Some(format!("dependent {} was not destroyed", dependent)),
  }
}

fn outcome_symbol(outcome: &Outcome) -> String {
  match outcome {
    Outcome::Succeeded => symbols::SUCCESS
      .if_supports_color(Stream::Stdout, |s| s.green())
      .to_string(),
    Outcome::Failed(_) => symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()).to_string(),
    Outcome::Skipped { .. } => symbols::SKIP.if_supports_color(Stream::Stdout, |s| s.yellow()).to_string(),
    Outcome::Blocked { .. } => symbols::BLOCKED
      .if_supports_color(Stream::Stdout, |s| s.yellow())
      .to_string(),
    Outcome::Cancelled => symbols::WARNING
      .if_supports_color(Stream::Stdout, |s| s.yellow())
      .to_string(),
  }
}

/// Print a run report as text or JSON.
pub fn print_report(report: &RunReport, elapsed: Duration, format: OutputFormat) -> anyhow::Result<()> {
  if format.is_json() {
    return print_json(&ReportJson::new(report, elapsed));
  }

  let width = report.entries.iter().map(|e| e.id.as_str().len()).max().unwrap_or(0);

  for entry in &report.entries {
    let detail = match (&entry.outcome, outcome_detail(&entry.outcome)) {
      (Outcome::Succeeded, _) => String::new(),
      (outcome, Some(detail)) => format!("  {}: {}", outcome.label(), first_line(&detail)),
      (outcome, None) => format!("  {}", outcome.label()),
    };
    println!(
      "  {} {:width$} {} {}{}",
      outcome_symbol(&entry.outcome),
      entry.id.as_str(),
      symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      entry.state,
      detail.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      width = width
    );
  }

  println!();
  let summary = summary_line(report);
  if report.is_success() {
    print_success(&format!(
      "{} complete in {} ({})",
      report.kind,
      format_duration(elapsed),
      summary
    ));
  } else {
    print_warning(&format!(
      "{} finished with problems in {} ({})",
      report.kind,
      format_duration(elapsed),
      summary
    ));
  }
  print_stat("Run", &report.run_id);

  Ok(())
}

/// Counts of each outcome, omitting zeros.
pub fn summary_line(report: &RunReport) -> String {
  let counts = [
    (report.succeeded(), "succeeded"),
    (report.failed(), "failed"),
    (report.skipped(), "skipped"),
    (report.blocked(), "blocked"),
    (report.cancelled(), "cancelled"),
  ];
  let parts: Vec<String> = counts
    .iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, label)| format!("{} {}", n, label))
    .collect();
  if parts.is_empty() {
    "nothing to do".to_string()
  } else {
    parts.join(", ")
  }
}

fn first_line(text: &str) -> &str {
  text.lines().next().unwrap_or("")
}
