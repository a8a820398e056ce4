use std::collections::{BTreeMap, BTreeSet, HashMap};

use formwright_config::ApiDescriptor;
use serde::Serialize;

use crate::deps::Dependencies;
use crate::error::GraphError;

/// Static execution plan for a set of API descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyPlan {
  /// Sources grouped into waves; every source only depends on earlier waves.
  pub batches: Vec<Vec<String>>,
  /// Each cycle found, as the sources along it.
  pub cycles: Vec<Vec<String>>,
  /// Source name -> referenced source names that are not declared.
  pub unknown: BTreeMap<String, Vec<String>>,
  /// Sources that can never run: on a cycle, referencing an unknown source,
  /// or downstream of either.
  pub blocked: Vec<String>,
}

/// Dependency graph over named API sources.
///
/// Nodes are descriptor names; an edge `a -> b` means `b` references
/// `${api.a…}`.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
  dependencies: BTreeMap<String, Dependencies>,
  /// Adjacency list: source -> sources that reference it.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: source -> declared sources it references.
  reverse_adjacency: HashMap<String, Vec<String>>,
  unknown: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
  /// Build the graph from declared descriptors.
  pub fn new(descriptors: &BTreeMap<String, ApiDescriptor>) -> Self {
    let dependencies: BTreeMap<String, Dependencies> = descriptors
      .iter()
      .map(|(name, descriptor)| (name.clone(), Dependencies::extract(descriptor)))
      .collect();

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut unknown: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for name in dependencies.keys() {
      adjacency.entry(name.clone()).or_default();
      reverse_adjacency.entry(name.clone()).or_default();
    }

    for (name, deps) in &dependencies {
      for upstream in &deps.api {
        if dependencies.contains_key(upstream) {
          adjacency
            .entry(upstream.clone())
            .or_default()
            .push(name.clone());
          reverse_adjacency
            .entry(name.clone())
            .or_default()
            .push(upstream.clone());
        } else {
          unknown
            .entry(name.clone())
            .or_default()
            .push(upstream.clone());
        }
      }
    }

    Self {
      dependencies,
      adjacency,
      reverse_adjacency,
      unknown,
    }
  }

  /// Extracted dependencies of a source.
  pub fn dependencies(&self, name: &str) -> Option<&Dependencies> {
    self.dependencies.get(name)
  }

  /// All sources with their dependencies, ordered by name.
  pub fn sources(&self) -> impl Iterator<Item = (&String, &Dependencies)> {
    self.dependencies.iter()
  }

  /// Sources that reference the given source.
  pub fn downstream(&self, name: &str) -> &[String] {
    self
      .adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Declared sources the given source references.
  pub fn upstream(&self, name: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(name)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Find cycles with a depth-first search.
  pub fn cycles(&self) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      Visiting,
      Done,
    }

    fn visit(
      graph: &DependencyGraph,
      node: &str,
      marks: &mut HashMap<String, Mark>,
      stack: &mut Vec<String>,
      found: &mut BTreeSet<Vec<String>>,
    ) {
      marks.insert(node.to_string(), Mark::Visiting);
      stack.push(node.to_string());

      for next in graph.downstream(node) {
        match marks.get(next.as_str()) {
          Some(Mark::Visiting) => {
            if let Some(pos) = stack.iter().position(|n| n == next) {
              let mut cycle = stack[pos..].to_vec();
              // Rotate so the same cycle found from another entry compares equal.
              if let Some(min) = cycle
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.cmp(b.1))
                .map(|(i, _)| i)
              {
                cycle.rotate_left(min);
              }
              found.insert(cycle);
            }
          }
          Some(Mark::Done) => {}
          None => visit(graph, next, marks, stack, found),
        }
      }

      stack.pop();
      marks.insert(node.to_string(), Mark::Done);
    }

    let mut marks = HashMap::new();
    let mut found = BTreeSet::new();
    for name in self.dependencies.keys() {
      if !marks.contains_key(name) {
        visit(self, name, &mut marks, &mut Vec::new(), &mut found);
      }
    }

    found.into_iter().collect()
  }

  /// Compute topological batches, cycles and blocked sources.
  pub fn plan(&self) -> DependencyPlan {
    let cycles = self.cycles();

    // Everything downstream of a cycle member or an unknown reference is blocked.
    let mut blocked: BTreeSet<String> = BTreeSet::new();
    let mut frontier: Vec<String> = cycles
      .iter()
      .flatten()
      .chain(self.unknown.keys())
      .cloned()
      .collect();
    while let Some(name) = frontier.pop() {
      if blocked.insert(name.clone()) {
        frontier.extend(self.downstream(&name).iter().cloned());
      }
    }

    // Kahn's algorithm over the remaining sources.
    let mut in_degree: BTreeMap<&str, usize> = self
      .dependencies
      .keys()
      .filter(|name| !blocked.contains(*name))
      .map(|name| (name.as_str(), self.upstream(name).len()))
      .collect();

    let mut batches = Vec::new();
    loop {
      let batch: Vec<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| name.to_string())
        .collect();
      if batch.is_empty() {
        break;
      }

      for name in &batch {
        in_degree.remove(name.as_str());
        for next in self.downstream(name) {
          if let Some(degree) = in_degree.get_mut(next.as_str()) {
            *degree = degree.saturating_sub(1);
          }
        }
      }
      batches.push(batch);
    }

    DependencyPlan {
      batches,
      cycles,
      unknown: self.unknown.clone(),
      blocked: blocked.into_iter().collect(),
    }
  }

  /// Fail on the first cycle or unknown source reference.
  pub fn validate(&self) -> Result<(), GraphError> {
    if let Some(members) = self.cycles().into_iter().next() {
      return Err(GraphError::Cycle { members });
    }
    if let Some((descriptor, names)) = self.unknown.iter().next() {
      return Err(GraphError::UnknownSource {
        descriptor: descriptor.clone(),
        source_name: names.first().cloned().unwrap_or_default(),
      });
    }
    Ok(())
  }
}
