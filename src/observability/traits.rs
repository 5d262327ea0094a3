use crate::engine::PlanStatus;
use crate::planner::StepId;
use std::time::Duration;

/// Lifecycle events emitted while a plan runs
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    PlanStarted {
        run_id: String,
        steps: usize,
    },
    BatchStarted {
        run_id: String,
        index: usize,
        steps: Vec<StepId>,
    },
    StepStarted {
        step_id: StepId,
        tool: String,
    },
    StepRetry {
        step_id: StepId,
        attempt: u32,
        error: String,
    },
    StepFinished {
        step_id: StepId,
        tool: String,
        success: bool,
        attempts: u32,
        duration: Duration,
    },
    StepSkipped {
        step_id: StepId,
        reason: String,
    },
    PlanFinished {
        run_id: String,
        status: PlanStatus,
        steps_run: usize,
        duration: Duration,
    },
}

/// Sink for run events
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &RunEvent);

    /// Backend name for diagnostics
    fn name(&self) -> &str;
}
