use super::result::StepState;
use crate::error::PlanError;
use crate::planner::{Plan, StepId, find_cycle};
use std::collections::{BTreeMap, BTreeSet};

/// Decides which steps may run next. Pure: it reads the plan and the
/// current per-step states and never executes anything.
#[derive(Debug, Clone, Copy)]
pub struct StepScheduler<'p> {
    plan: &'p Plan,
    continue_on_failure: bool,
}

impl<'p> StepScheduler<'p> {
    pub fn new(plan: &'p Plan, continue_on_failure: bool) -> Self {
        Self {
            plan,
            continue_on_failure,
        }
    }

    /// Every step `Pending`.
    pub fn initial_states(&self) -> BTreeMap<StepId, StepState> {
        self.plan
            .step_ids()
            .map(|id| (id, StepState::Pending))
            .collect()
    }

    /// Whether a dependency in `state` lets its dependents proceed.
    pub fn satisfies_dependency(&self, state: StepState) -> bool {
        match state {
            StepState::Succeeded => true,
            StepState::Failed | StepState::Skipped => self.continue_on_failure,
            StepState::Pending | StepState::Ready | StepState::Running => false,
        }
    }

    /// Steps awaiting execution whose dependencies are all satisfied,
    /// ascending by id.
    ///
    /// An empty batch while steps are still waiting means nothing can make
    /// progress; if the waiting steps form a cycle this is reported as
    /// [`PlanError::Cycle`].
    pub fn next_ready_batch(
        &self,
        states: &BTreeMap<StepId, StepState>,
    ) -> Result<BTreeSet<StepId>, PlanError> {
        let waiting = self
            .plan
            .steps
            .iter()
            .filter(|step| {
                matches!(
                    states.get(&step.id),
                    Some(StepState::Pending | StepState::Ready)
                )
            })
            .collect::<Vec<_>>();

        let ready = waiting
            .iter()
            .filter(|step| {
                step.dependencies.iter().all(|dependency| {
                    states
                        .get(dependency)
                        .is_some_and(|state| self.satisfies_dependency(*state))
                })
            })
            .map(|step| step.id)
            .collect::<BTreeSet<_>>();

        if ready.is_empty() && !waiting.is_empty() {
            let waiting_ids = waiting.iter().map(|step| step.id).collect::<BTreeSet<_>>();
            let mut adjacency: BTreeMap<StepId, BTreeSet<StepId>> = BTreeMap::new();
            for step in &waiting {
                adjacency.entry(step.id).or_default();
                for dependency in step.dependencies.intersection(&waiting_ids) {
                    adjacency.entry(*dependency).or_default().insert(step.id);
                }
            }
            if let Some(path) = find_cycle(&adjacency) {
                tracing::debug!(cycle = ?path, "scheduler.cycle_detected");
                return Err(PlanError::Cycle { path });
            }
        }

        tracing::debug!(ready = ?ready, waiting = waiting.len(), "scheduler.batch");
        Ok(ready)
    }

    /// Steps not yet in a terminal state.
    pub fn unfinished(states: &BTreeMap<StepId, StepState>) -> Vec<StepId> {
        states
            .iter()
            .filter_map(|(id, state)| (!state.is_terminal()).then_some(*id))
            .collect()
    }

    pub fn is_finished(states: &BTreeMap<StepId, StepState>) -> bool {
        states.values().all(|state| state.is_terminal())
    }
}
