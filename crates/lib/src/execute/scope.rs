//! Selective scope resolution.
//!
//! Turns an "only" filter into a closed set of installations: the requested ids
//! plus everything they transitively depend on (or, in the other direction,
//! everything that transitively depends on them).

use std::collections::BTreeSet;

use tracing::debug;

use crate::installation::InstallationId;

use super::dag::DependencyGraph;
use super::types::ScopeError;

/// Which edges a scope is closed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDirection {
  /// Requested ids plus all transitive dependencies (build, validate).
  Dependencies,
  /// Requested ids plus all transitive dependents (teardown of a subset).
  Dependents,
}

/// A validated, closed subset of a workspace's installations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
  members: BTreeSet<InstallationId>,
  requested: BTreeSet<InstallationId>,
}

impl Scope {
  /// The whole workspace.
  pub fn all(graph: &DependencyGraph) -> Self {
    let members: BTreeSet<InstallationId> = graph.ids().cloned().collect();
    Self {
      requested: members.clone(),
      members,
    }
  }

  /// Close `requested` over `direction`.
  ///
  /// # Errors
  ///
  /// - `UnknownInstallation` if any requested id is not in the graph; nothing
  ///   is expanded in that case.
  /// - `Empty` if nothing was requested.
  pub fn resolve<I, S>(graph: &DependencyGraph, requested: I, direction: ScopeDirection) -> Result<Self, ScopeError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let requested: BTreeSet<InstallationId> = requested.into_iter().map(|s| InstallationId(s.into())).collect();
    if requested.is_empty() {
      return Err(ScopeError::Empty);
    }
    if let Some(unknown) = requested.iter().find(|id| !graph.contains(id)) {
      return Err(ScopeError::UnknownInstallation(unknown.clone()));
    }

    let mut members = BTreeSet::new();
    let mut stack: Vec<&InstallationId> = requested.iter().collect();
    while let Some(id) = stack.pop() {
      if !members.insert(id.clone()) {
        continue;
      }
      let next = match direction {
        ScopeDirection::Dependencies => graph.dependencies(id),
        ScopeDirection::Dependents => graph.dependents(id),
      };
      stack.extend(next.into_iter().filter(|n| !members.contains(*n)));
    }

    debug!(
      requested = requested.len(),
      resolved = members.len(),
      ?direction,
      "resolved scope"
    );

    Ok(Self { members, requested })
  }

  pub fn contains(&self, id: &InstallationId) -> bool {
    self.members.contains(id)
  }

  /// Members in ascending id order.
  pub fn iter(&self) -> impl Iterator<Item = &InstallationId> {
    self.members.iter()
  }

  /// The ids that were asked for, before closure.
  pub fn requested(&self) -> &BTreeSet<InstallationId> {
    &self.requested
  }

  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }
}
