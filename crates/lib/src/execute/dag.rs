//! Dependency graph for installation lifecycle planning.
//!
//! This module turns a set of installations into a directed acyclic graph with
//! edges pointing from dependency to dependent, validating that every referenced
//! id exists and that the relation has no cycles.

use std::collections::{BTreeMap, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::installation::{Installation, InstallationId};

use super::types::ManifestError;

/// DFS marker used for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  Visiting,
  Done,
}

/// A validated, acyclic dependency graph over a workspace's installations.
///
/// The graph is derived, never mutated: it is rebuilt from the installation set
/// on every command. Nodes are inserted in ascending id order, so building twice
/// from the same set (in any input order) yields the same structure.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  /// The underlying graph. Edge `a -> b` means `b` depends on `a`.
  graph: DiGraph<InstallationId, ()>,

  /// Map from installation id to node index.
  nodes: BTreeMap<InstallationId, NodeIndex>,

  /// Pre-order position of each node in the validating depth-first walk.
  discovery: HashMap<NodeIndex, usize>,
}

impl DependencyGraph {
  /// Build and validate the graph for a set of installations.
  ///
  /// # Errors
  ///
  /// - `DuplicateInstallation` if two installations share an id.
  /// - `UnknownDependency` if a dependency id is not in the set.
  /// - `Cycle` with the offending path if the relation is cyclic.
  pub fn build(installations: &[Installation]) -> Result<Self, ManifestError> {
    let mut sorted: Vec<&Installation> = installations.iter().collect();
    sorted.sort_by(|a, b| a.id().cmp(b.id()));

    let mut graph = DiGraph::new();
    let mut nodes = BTreeMap::new();

    // First pass: one node per installation
    for inst in &sorted {
      if nodes.contains_key(inst.id()) {
        return Err(ManifestError::DuplicateInstallation(inst.id().clone()));
      }
      let idx = graph.add_node(inst.id().clone());
      nodes.insert(inst.id().clone(), idx);
    }

    // Second pass: edges from dependency to dependent
    for inst in &sorted {
      let dependent_idx = nodes[inst.id()];
      for dep in inst.dependencies() {
        let Some(&dep_idx) = nodes.get(dep) else {
          return Err(ManifestError::UnknownDependency {
            installation: inst.id().clone(),
            dependency: dep.clone(),
          });
        };
        graph.add_edge(dep_idx, dependent_idx, ());
      }
    }

    let mut dag = Self {
      graph,
      nodes,
      discovery: HashMap::new(),
    };
    dag.discovery = dag.verify_acyclic()?;

    Ok(dag)
  }

  /// Depth-first walk that fails on the first back-edge.
  ///
  /// Roots and neighbors are visited in ascending id order so both the
  /// reported cycle and the discovery order are deterministic.
  fn verify_acyclic(&self) -> Result<HashMap<NodeIndex, usize>, ManifestError> {
    let mut marks: HashMap<NodeIndex, Mark> = self.graph.node_indices().map(|idx| (idx, Mark::Unvisited)).collect();
    let mut discovery = HashMap::new();

    for &root in self.nodes.values() {
      if marks[&root] != Mark::Unvisited {
        continue;
      }

      // Explicit stack of (node, sorted dependents, next dependent position)
      let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = Vec::new();
      marks.insert(root, Mark::Visiting);
      discovery.insert(root, discovery.len());
      stack.push((root, self.sorted_neighbors(root, Direction::Outgoing), 0));

      while let Some((node, neighbors, next)) = stack.last_mut() {
        let Some(&child) = neighbors.get(*next) else {
          marks.insert(*node, Mark::Done);
          stack.pop();
          continue;
        };
        *next += 1;

        match marks[&child] {
          Mark::Done => {}
          Mark::Visiting => {
            let start = stack.iter().position(|(n, _, _)| *n == child).unwrap_or(0);
            let mut cycle: Vec<InstallationId> = stack[start..].iter().map(|(n, _, _)| self.graph[*n].clone()).collect();
            cycle.push(self.graph[child].clone());
            return Err(ManifestError::Cycle(cycle));
          }
          Mark::Unvisited => {
            marks.insert(child, Mark::Visiting);
            discovery.insert(child, discovery.len());
            let children = self.sorted_neighbors(child, Direction::Outgoing);
            stack.push((child, children, 0));
          }
        }
      }
    }

    Ok(discovery)
  }

  fn sorted_neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
    let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
    neighbors.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
    neighbors.dedup();
    neighbors
  }

  /// Whether the graph contains an installation with this id.
  pub fn contains(&self, id: &InstallationId) -> bool {
    self.nodes.contains_key(id)
  }

  /// Get the number of installations in the graph.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// All installation ids, ascending.
  pub fn ids(&self) -> impl Iterator<Item = &InstallationId> {
    self.nodes.keys()
  }

  /// Direct dependencies of an installation, ascending.
  pub fn dependencies(&self, id: &InstallationId) -> Vec<&InstallationId> {
    self.neighbors(id, Direction::Incoming)
  }

  /// Direct dependents of an installation, ascending.
  pub fn dependents(&self, id: &InstallationId) -> Vec<&InstallationId> {
    self.neighbors(id, Direction::Outgoing)
  }

  fn neighbors(&self, id: &InstallationId, direction: Direction) -> Vec<&InstallationId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };
    self
      .sorted_neighbors(idx, direction)
      .into_iter()
      .map(|n| &self.graph[n])
      .collect()
  }

  /// Position of an installation in the validating walk's pre-order.
  pub fn discovery_index(&self, id: &InstallationId) -> Option<usize> {
    self.nodes.get(id).and_then(|idx| self.discovery.get(idx)).copied()
  }

  pub(crate) fn node(&self, id: &InstallationId) -> Option<NodeIndex> {
    self.nodes.get(id).copied()
  }

  pub(crate) fn inner(&self) -> &DiGraph<InstallationId, ()> {
    &self.graph
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::installation::Installation;
  use crate::util::testutil::{chart, ids};

  #[test]
  fn empty_workspace() {
    let dag = DependencyGraph::build(&[]).unwrap();
    assert!(dag.is_empty());
    assert_eq!(dag.len(), 0);
  }

  #[test]
  fn linear_dependency_chain() {
    // C depends on B, B depends on A
    let installs = vec![chart("c", &["b"]), chart("a", &[]), chart("b", &["a"])];
    let dag = DependencyGraph::build(&installs).unwrap();

    assert_eq!(dag.len(), 3);
    assert!(dag.dependencies(&"a".into()).is_empty());
    assert_eq!(dag.dependencies(&"b".into()), vec![&InstallationId::from("a")]);
    assert_eq!(dag.dependents(&"b".into()), vec![&InstallationId::from("c")]);
    assert!(dag.dependents(&"c".into()).is_empty());
  }

  #[test]
  fn unknown_dependency_is_rejected() {
    let installs = vec![chart("a", &[]), chart("b", &["ghost"])];
    let err = DependencyGraph::build(&installs).unwrap_err();
    assert_eq!(
      err,
      ManifestError::UnknownDependency {
        installation: "b".into(),
        dependency: "ghost".into(),
      }
    );
  }

  #[test]
  fn duplicate_id_is_rejected() {
    let installs = vec![chart("a", &[]), chart("a", &[])];
    let err = DependencyGraph::build(&installs).unwrap_err();
    assert_eq!(err, ManifestError::DuplicateInstallation("a".into()));
  }

  #[test]
  fn two_node_cycle_is_named() {
    let installs = vec![chart("a", &["b"]), chart("b", &["a"])];
    let err = DependencyGraph::build(&installs).unwrap_err();
    assert_eq!(err, ManifestError::Cycle(ids(&["a", "b", "a"])));
  }

  #[test]
  fn self_dependency_is_a_cycle() {
    let installs = vec![chart("a", &["a"])];
    let err = DependencyGraph::build(&installs).unwrap_err();
    assert_eq!(err, ManifestError::Cycle(ids(&["a", "a"])));
  }

  #[test]
  fn cycle_behind_acyclic_prefix_is_found() {
    // root -> x -> y -> z -> x
    let installs = vec![
      chart("root", &[]),
      chart("x", &["root", "z"]),
      chart("y", &["x"]),
      chart("z", &["y"]),
    ];
    let err = DependencyGraph::build(&installs).unwrap_err();
    let ManifestError::Cycle(path) = err else {
      panic!("expected cycle, got {err:?}");
    };
    assert_eq!(path.first(), path.last());
    assert_eq!(path.len(), 4);
    for member in ["x", "y", "z"] {
      assert!(path.contains(&member.into()), "cycle should contain {member}");
    }
    assert!(!path.contains(&"root".into()));
  }

  #[test]
  fn build_is_independent_of_input_order() {
    let forward = vec![chart("a", &[]), chart("b", &["a"]), chart("c", &["a", "b"])];
    let mut backward = forward.clone();
    backward.reverse();

    let g1 = DependencyGraph::build(&forward).unwrap();
    let g2 = DependencyGraph::build(&backward).unwrap();

    let ids1: Vec<_> = g1.ids().collect();
    let ids2: Vec<_> = g2.ids().collect();
    assert_eq!(ids1, ids2);
    for id in g1.ids() {
      assert_eq!(g1.dependencies(id), g2.dependencies(id));
      assert_eq!(g1.discovery_index(id), g2.discovery_index(id));
    }
  }

  #[test]
  fn discovery_order_is_preorder_from_sorted_roots() {
    // a and d are roots; b depends on a; c depends on b
    let installs = vec![chart("a", &[]), chart("b", &["a"]), chart("c", &["b"]), chart("d", &[])];
    let dag = DependencyGraph::build(&installs).unwrap();

    assert_eq!(dag.discovery_index(&"a".into()), Some(0));
    assert_eq!(dag.discovery_index(&"b".into()), Some(1));
    assert_eq!(dag.discovery_index(&"c".into()), Some(2));
    assert_eq!(dag.discovery_index(&"d".into()), Some(3));
    assert_eq!(dag.discovery_index(&"zzz".into()), None);
  }

  /// Random DAG with a chain `lo <- lo+1 <- ... <- hi` and a back-edge making
  /// `lo` depend on `hi`.
  fn arb_cyclic() -> impl Strategy<Value = Vec<Installation>> {
    (2usize..10)
      .prop_flat_map(|n| (Just(n), proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n), 0..n - 1))
      .prop_flat_map(|(n, matrix, lo)| (Just(n), Just(matrix), Just(lo), lo + 1..n))
      .prop_map(|(n, matrix, lo, hi)| {
        (0..n)
          .map(|i| {
            let mut deps: Vec<String> = (0..i)
              .filter(|&j| matrix[i][j] || (j + 1 == i && i > lo && i <= hi))
              .map(|j| format!("n{:02}", j))
              .collect();
            if i == lo {
              deps.push(format!("n{:02}", hi));
            }
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            chart(&format!("n{:02}", i), &deps)
          })
          .collect()
      })
  }

  proptest! {
    #[test]
    fn any_back_edge_is_reported_as_cycle(installs in arb_cyclic()) {
      let err = DependencyGraph::build(&installs).unwrap_err();
      let ManifestError::Cycle(path) = err else {
        return Err(TestCaseError::fail(format!("expected cycle, got {err:?}")));
      };
      prop_assert!(path.len() >= 2);
      prop_assert_eq!(path.first(), path.last());

      // Each step follows an edge: the next id depends on the previous one
      for pair in path.windows(2) {
        let next = installs.iter().find(|inst| inst.id() == &pair[1]).unwrap();
        prop_assert!(next.dependencies().contains(&pair[0]), "{} does not depend on {}", pair[1], pair[0]);
      }
    }
  }
}
