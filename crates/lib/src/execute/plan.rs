//! Execution plans: wave decomposition of a dependency graph.
//!
//! A plan is an ordered list of waves. Every installation in a wave has all of
//! its dependencies in earlier waves and no dependency relation to anything
//! else in its own wave, so a wave can be processed concurrently.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graph::NodeIndex;

use crate::installation::InstallationId;

use super::dag::DependencyGraph;
use super::scope::Scope;

/// Which way a plan is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDirection {
  /// Dependencies before dependents (build, validate, deploy).
  Forward,
  /// Dependents before dependencies (destroy).
  Reverse,
}

/// An ordered sequence of waves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
  direction: PlanDirection,
  waves: Vec<Vec<InstallationId>>,
}

impl ExecutionPlan {
  /// Forward plan over the whole graph.
  pub fn forward(graph: &DependencyGraph) -> Self {
    Self::for_scope(graph, &Scope::all(graph))
  }

  /// Forward plan restricted to the installations in `scope`.
  ///
  /// Each installation lands in the earliest wave after all of its in-scope
  /// dependencies. Ties within a wave are broken by ascending id.
  pub fn for_scope(graph: &DependencyGraph, scope: &Scope) -> Self {
    let members: Vec<NodeIndex> = scope.iter().filter_map(|id| graph.node(id)).collect();
    let member_set: BTreeSet<NodeIndex> = members.iter().copied().collect();
    let inner = graph.inner();

    // Use Kahn's algorithm variant to compute levels
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    for &idx in &members {
      let deps = inner
        .neighbors_directed(idx, Direction::Incoming)
        .filter(|dep| member_set.contains(dep))
        .collect::<BTreeSet<_>>();
      in_degree.insert(idx, deps.len());
    }

    let mut remaining: BTreeSet<NodeIndex> = member_set.clone();
    let mut waves: Vec<Vec<InstallationId>> = Vec::new();

    while !remaining.is_empty() {
      // Find nodes with no remaining dependencies
      let ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[*idx] == 0).copied().collect();

      // The graph was validated acyclic when it was built
      debug_assert!(!ready.is_empty(), "acyclic graph always has a ready node");
      if ready.is_empty() {
        break;
      }

      for &idx in &ready {
        remaining.remove(&idx);
        let dependents: BTreeSet<NodeIndex> = inner
          .neighbors_directed(idx, Direction::Outgoing)
          .filter(|n| member_set.contains(n))
          .collect();
        for dependent in dependents {
          if let Some(deg) = in_degree.get_mut(&dependent) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      let mut wave: Vec<InstallationId> = ready.into_iter().map(|idx| inner[idx].clone()).collect();
      wave.sort();
      waves.push(wave);
    }

    Self {
      direction: PlanDirection::Forward,
      waves,
    }
  }

  /// The same wave partition traversed in the opposite direction.
  ///
  /// Reversing the forward waves is sufficient for teardown: a dependent always
  /// sits in a strictly later forward wave than each of its dependencies.
  pub fn reverse(&self) -> Self {
    Self {
      direction: match self.direction {
        PlanDirection::Forward => PlanDirection::Reverse,
        PlanDirection::Reverse => PlanDirection::Forward,
      },
      waves: self.waves.iter().rev().cloned().collect(),
    }
  }

  pub fn direction(&self) -> PlanDirection {
    self.direction
  }

  pub fn waves(&self) -> &[Vec<InstallationId>] {
    &self.waves
  }

  /// Get the number of waves.
  pub fn len(&self) -> usize {
    self.waves.len()
  }

  pub fn is_empty(&self) -> bool {
    self.waves.is_empty()
  }

  /// Get the number of installations across all waves.
  pub fn installation_count(&self) -> usize {
    self.waves.iter().map(Vec::len).sum()
  }

  /// Waves concatenated in order.
  pub fn flatten(&self) -> Vec<InstallationId> {
    self.waves.iter().flatten().cloned().collect()
  }

  /// Index of the wave containing `id`.
  pub fn wave_of(&self, id: &InstallationId) -> Option<usize> {
    self.waves.iter().position(|w| w.contains(id))
  }
}

/// Deterministic topological order of a workspace, dependencies first.
pub fn topological_order(graph: &DependencyGraph) -> Vec<InstallationId> {
  ExecutionPlan::forward(graph).flatten()
}
