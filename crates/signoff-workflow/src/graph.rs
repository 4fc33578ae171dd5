use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::WorkflowError;
use crate::workflow::WorkflowStep;

/// Step graph for traversal.
///
/// Fan-out (several steps reachable from one step) is what produces more
/// than one simultaneously current step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepGraph {
  /// Adjacency list: step_id -> list of downstream step_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Steps with no incoming edges, in step order.
  entry_points: Vec<String>,
  edges: Vec<(String, String)>,
}

impl StepGraph {
  /// Build and validate the graph for `steps`.
  ///
  /// `steps` must already be in sequence order. With no declared edges, the
  /// edges are derived from sequence numbers.
  pub fn build(steps: &[WorkflowStep], edges: &[(String, String)]) -> Result<Self, WorkflowError> {
    if steps.is_empty() {
      return Err(WorkflowError::NoSteps);
    }

    let mut step_ids = HashSet::new();
    for step in steps {
      if !step_ids.insert(step.step_id.as_str()) {
        return Err(WorkflowError::DuplicateStep(step.step_id.clone()));
      }
    }

    let edges = if edges.is_empty() {
      sequence_edges(steps)
    } else {
      for (from, to) in edges {
        if !step_ids.contains(from.as_str()) || !step_ids.contains(to.as_str()) {
          return Err(WorkflowError::InvalidEdge {
            from: from.clone(),
            to: to.clone(),
          });
        }
      }
      edges.to_vec()
    };

    detect_cycle(&step_ids, &edges)?;

    let mut adjacency: HashMap<String, Vec<String>> = steps
      .iter()
      .map(|step| (step.step_id.clone(), Vec::new()))
      .collect();
    let mut has_incoming = HashSet::new();
    for (from, to) in &edges {
      adjacency.entry(from.clone()).or_default().push(to.clone());
      has_incoming.insert(to.as_str());
    }

    let entry_points: Vec<String> = steps
      .iter()
      .map(|s| &s.step_id)
      .filter(|id| !has_incoming.contains(id.as_str()))
      .cloned()
      .collect();
    if entry_points.is_empty() {
      return Err(WorkflowError::NoEntryPoints);
    }

    Ok(Self {
      adjacency,
      entry_points,
      edges,
    })
  }

  /// Steps with no incoming edges: the ones that start out current.
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  pub fn downstream(&self, step_id: &str) -> &[String] {
    self
      .adjacency
      .get(step_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Effective edges, declared or derived.
  pub fn edges(&self) -> &[(String, String)] {
    &self.edges
  }
}

/// Link every step of a sequence group to every step of the next group.
fn sequence_edges(steps: &[WorkflowStep]) -> Vec<(String, String)> {
  let mut groups: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
  for step in steps {
    groups
      .entry(step.sequence)
      .or_default()
      .push(step.step_id.as_str());
  }

  let groups: Vec<Vec<&str>> = groups.into_values().collect();
  groups
    .windows(2)
    .flat_map(|pair| {
      let (from, to) = (&pair[0], &pair[1]);
      from
        .iter()
        .flat_map(move |f| to.iter().map(move |t| (f.to_string(), t.to_string())))
    })
    .collect()
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

fn detect_cycle(step_ids: &HashSet<&str>, edges: &[(String, String)]) -> Result<(), WorkflowError> {
  let mut adjacency: HashMap<&str, Vec<&str>> =
    step_ids.iter().map(|id| (*id, Vec::new())).collect();
  for (from, to) in edges {
    if let Some(next) = adjacency.get_mut(from.as_str()) {
      next.push(to.as_str());
    }
  }

  fn visit<'a>(
    step: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
  ) -> bool {
    marks.insert(step, Mark::InProgress);
    for &next in adjacency.get(step).map(|v| v.as_slice()).unwrap_or(&[]) {
      match marks.get(next).copied().unwrap_or(Mark::Unvisited) {
        Mark::InProgress => return true,
        Mark::Unvisited if visit(next, adjacency, marks) => return true,
        _ => {}
      }
    }
    marks.insert(step, Mark::Done);
    false
  }

  let mut marks: HashMap<&str, Mark> = step_ids.iter().map(|id| (*id, Mark::Unvisited)).collect();
  for &id in step_ids {
    if marks.get(id) == Some(&Mark::Unvisited) && visit(id, &adjacency, &mut marks) {
      return Err(WorkflowError::CycleDetected);
    }
  }

  Ok(())
}
