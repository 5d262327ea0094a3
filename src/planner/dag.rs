use super::types::{Step, StepId};
use crate::error::PlanError;
use std::collections::{BTreeMap, BTreeSet};

/// Dependency edges of a plan, keyed both ways.
#[derive(Debug, Clone, Default)]
pub(crate) struct DependencyGraph {
    /// step -> steps it waits on
    prerequisites: BTreeMap<StepId, BTreeSet<StepId>>,
    /// step -> steps waiting on it
    dependents: BTreeMap<StepId, BTreeSet<StepId>>,
}

impl DependencyGraph {
    /// Build the graph, rejecting duplicate ids and dangling dependencies.
    pub(crate) fn build(steps: &[Step]) -> Result<Self, PlanError> {
        let node_ids = validate_nodes(steps)?;

        let mut graph = Self::default();
        for id in &node_ids {
            graph.prerequisites.insert(*id, BTreeSet::new());
            graph.dependents.insert(*id, BTreeSet::new());
        }

        for step in steps {
            for dependency in &step.dependencies {
                if !node_ids.contains(dependency) {
                    return Err(PlanError::MissingDependency {
                        step: step.id,
                        dependency: *dependency,
                    });
                }
                graph
                    .prerequisites
                    .entry(step.id)
                    .or_default()
                    .insert(*dependency);
                graph
                    .dependents
                    .entry(*dependency)
                    .or_default()
                    .insert(step.id);
            }
        }

        Ok(graph)
    }

    pub(crate) fn validate(&self) -> Result<(), PlanError> {
        match find_cycle(&self.dependents) {
            Some(path) => Err(PlanError::Cycle { path }),
            None => Ok(()),
        }
    }

    /// Partition into waves; wave `k` only depends on waves `< k`.
    pub(crate) fn layers(&self) -> Result<Vec<BTreeSet<StepId>>, PlanError> {
        let mut in_degree = self
            .prerequisites
            .iter()
            .map(|(id, parents)| (*id, parents.len()))
            .collect::<BTreeMap<_, _>>();

        let mut current = in_degree
            .iter()
            .filter_map(|(id, degree)| (*degree == 0).then_some(*id))
            .collect::<BTreeSet<_>>();

        let mut layers = Vec::new();
        let mut placed = 0_usize;
        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for id in &current {
                let Some(children) = self.dependents.get(id) else {
                    continue;
                };
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.insert(*child);
                        }
                    }
                }
            }
            placed += current.len();
            layers.push(current);
            current = next;
        }

        if placed != self.prerequisites.len() {
            let path = find_cycle(&self.dependents).unwrap_or_default();
            return Err(PlanError::Cycle { path });
        }

        Ok(layers)
    }

    pub(crate) fn dependents(&self) -> &BTreeMap<StepId, BTreeSet<StepId>> {
        &self.dependents
    }
}

fn validate_nodes(steps: &[Step]) -> Result<BTreeSet<StepId>, PlanError> {
    let mut node_ids = BTreeSet::new();
    for step in steps {
        if !node_ids.insert(step.id) {
            return Err(PlanError::DuplicateStepId(step.id));
        }
    }
    Ok(node_ids)
}

/// Depth-first search for a cycle in `adjacency` (edges point from a step to
/// the steps that wait on it). Returns the closed path, e.g. `[1, 2, 1]`.
pub(crate) fn find_cycle(adjacency: &BTreeMap<StepId, BTreeSet<StepId>>) -> Option<Vec<StepId>> {
    let mut states = BTreeMap::new();
    let mut stack = Vec::new();

    for node_id in adjacency.keys() {
        if states.contains_key(node_id) {
            continue;
        }
        if let Some(path) = detect_cycle(*node_id, adjacency, &mut states, &mut stack) {
            return Some(path);
        }
    }

    None
}

fn detect_cycle(
    node_id: StepId,
    adjacency: &BTreeMap<StepId, BTreeSet<StepId>>,
    states: &mut BTreeMap<StepId, NodeState>,
    stack: &mut Vec<StepId>,
) -> Option<Vec<StepId>> {
    states.insert(node_id, NodeState::Visiting);
    stack.push(node_id);

    if let Some(neighbors) = adjacency.get(&node_id) {
        for neighbor in neighbors {
            match states.get(neighbor) {
                Some(NodeState::Visiting) => {
                    if let Some(index) = stack.iter().position(|entry| entry == neighbor) {
                        let mut cycle = stack[index..].to_vec();
                        cycle.push(*neighbor);
                        return Some(cycle);
                    }
                    return Some(vec![*neighbor, *neighbor]);
                }
                Some(NodeState::Visited) => {}
                None => {
                    if let Some(path) = detect_cycle(*neighbor, adjacency, states, stack) {
                        return Some(path);
                    }
                }
            }
        }
    }

    stack.pop();
    states.insert(node_id, NodeState::Visited);
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Visiting,
    Visited,
}
