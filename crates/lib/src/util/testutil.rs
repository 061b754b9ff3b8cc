//! Test utilities for chartmart-lib.
//!
//! Builders for installation sets and an in-memory [`Operator`] that records
//! every call, so orchestration can be tested without helm or terraform.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::execute::{Cancellation, Operation, OperationError, Operator};
use crate::installation::{Installation, InstallationId, InstallationKind};

/// A chart installation with the given dependencies.
pub fn chart(id: &str, deps: &[&str]) -> Installation {
  Installation::new(id, InstallationKind::Chart)
    .unwrap()
    .with_dependencies(deps.iter().copied())
    .unwrap()
}

/// Convert string literals to installation ids.
pub fn ids(values: &[&str]) -> Vec<InstallationId> {
  values.iter().map(|v| InstallationId::from(*v)).collect()
}

/// Something that happened inside a [`RecordingOperator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  Started(Operation, String),
  Finished(Operation, String),
}

/// Operator that records calls and fails on request.
#[derive(Default)]
pub struct RecordingOperator {
  events: Mutex<Vec<Event>>,
  failures: HashSet<(Operation, String)>,
  delay: Duration,
  slow: HashMap<String, Duration>,
  cancel_on: Option<(String, Cancellation)>,
  active: AtomicUsize,
  max_active: AtomicUsize,
}

impl RecordingOperator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Fail `operation` for installation `id`.
  pub fn failing(mut self, operation: Operation, id: &str) -> Self {
    self.failures.insert((operation, id.to_string()));
    self
  }

  /// Sleep this long in every operation.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Sleep `delay` in every operation on `id` instead of the default delay.
  pub fn slow(mut self, id: &str, delay: Duration) -> Self {
    self.slow.insert(id.to_string(), delay);
    self
  }

  /// Trip `cancellation` when any operation on `id` finishes.
  pub fn cancel_on(mut self, id: &str, cancellation: Cancellation) -> Self {
    self.cancel_on = Some((id.to_string(), cancellation));
    self
  }

  pub fn events(&self) -> Vec<Event> {
    self.events.lock().unwrap().clone()
  }

  /// Started operations in start order.
  pub fn started(&self) -> Vec<(Operation, String)> {
    self
      .events()
      .into_iter()
      .filter_map(|e| match e {
        Event::Started(op, id) => Some((op, id)),
        Event::Finished(..) => None,
      })
      .collect()
  }

  /// Ids started for one operation, in start order.
  pub fn started_for(&self, operation: Operation) -> Vec<String> {
    self
      .started()
      .into_iter()
      .filter(|(op, _)| *op == operation)
      .map(|(_, id)| id)
      .collect()
  }

  /// Highest number of operations observed running at once.
  pub fn max_concurrency(&self) -> usize {
    self.max_active.load(Ordering::SeqCst)
  }

  async fn record(&self, operation: Operation, installation: &Installation) -> Result<String, OperationError> {
    let id = installation.id().to_string();
    self
      .events
      .lock()
      .unwrap()
      .push(Event::Started(operation, id.clone()));

    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_active.fetch_max(now, Ordering::SeqCst);

    let delay = self.slow.get(&id).copied().unwrap_or(self.delay);
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }

    self.active.fetch_sub(1, Ordering::SeqCst);
    self
      .events
      .lock()
      .unwrap()
      .push(Event::Finished(operation, id.clone()));

    if let Some((trigger, cancellation)) = &self.cancel_on
      && *trigger == id
    {
      cancellation.cancel();
    }

    if self.failures.contains(&(operation, id.clone())) {
      return Err(OperationError::Rejected(format!("{} of {} rejected", operation, id)));
    }
    Ok(format!("{} {}", operation, id))
  }
}

impl Operator for RecordingOperator {
  async fn build(&self, installation: &Installation) -> Result<String, OperationError> {
    self.record(Operation::Build, installation).await
  }

  async fn validate(&self, installation: &Installation) -> Result<String, OperationError> {
    self.record(Operation::Validate, installation).await
  }

  async fn deploy(&self, installation: &Installation) -> Result<String, OperationError> {
    self.record(Operation::Deploy, installation).await
  }

  async fn destroy(&self, installation: &Installation) -> Result<String, OperationError> {
    self.record(Operation::Destroy, installation).await
  }
}
