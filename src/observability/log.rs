use super::traits::{Observer, RunEvent};
use tracing::info;

/// Log-based observer: emits structured tracing events
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &RunEvent) {
        match event {
            RunEvent::PlanStarted { run_id, steps } => {
                info!(run_id = %run_id, steps = steps, "plan.start");
            }
            RunEvent::BatchStarted {
                run_id,
                index,
                steps,
            } => {
                info!(run_id = %run_id, batch = index, steps = ?steps, "batch.start");
            }
            RunEvent::StepStarted { step_id, tool } => {
                info!(step = step_id, tool = %tool, "step.start");
            }
            RunEvent::StepRetry {
                step_id,
                attempt,
                error,
            } => {
                info!(step = step_id, attempt = attempt, error = %error, "step.retry");
            }
            RunEvent::StepFinished {
                step_id,
                tool,
                success,
                attempts,
                duration,
            } => {
                info!(
                    step = step_id,
                    tool = %tool,
                    success = success,
                    attempts = attempts,
                    duration_ms = millis(*duration),
                    "step.finish"
                );
            }
            RunEvent::StepSkipped { step_id, reason } => {
                info!(step = step_id, reason = %reason, "step.skip");
            }
            RunEvent::PlanFinished {
                run_id,
                status,
                steps_run,
                duration,
            } => {
                info!(
                    run_id = %run_id,
                    status = %status,
                    steps_run = steps_run,
                    duration_ms = millis(*duration),
                    "plan.finish"
                );
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
