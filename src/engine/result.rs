use crate::error::{PlanError, StepError};
use crate::planner::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Per-step lifecycle: `Pending -> Ready -> Running -> {Succeeded, Failed, Skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Terminal classification of a plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Every step succeeded.
    Completed,
    /// The plan ran to exhaustion but some steps failed or were skipped.
    PartiallyCompleted,
    /// Stopped early: step budget, plan timeout, or a structural plan error.
    Aborted,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Why a run ended with [`PlanStatus::Aborted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    Invalid { error: PlanError },
    StepBudget { max_steps: usize },
    PlanTimeout { after_ms: u64 },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { error } => write!(f, "invalid plan: {error}"),
            Self::StepBudget { max_steps } => write!(f, "step budget of {max_steps} exhausted"),
            Self::PlanTimeout { after_ms } => write!(f, "plan timed out after {after_ms}ms"),
        }
    }
}

/// Outcome of one attempted step (retries folded in).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub step_id: StepId,
    pub tool: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// Tool invocations made, including the first.
    pub attempts: u32,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn succeeded(step_id: StepId, tool: impl Into<String>, output: Value) -> Self {
        Self {
            step_id,
            tool: tool.into(),
            success: true,
            output: Some(output),
            error: None,
            attempts: 1,
            duration_ms: 0,
        }
    }

    pub fn failed(step_id: StepId, tool: impl Into<String>, error: StepError) -> Self {
        Self {
            step_id,
            tool: tool.into(),
            success: false,
            output: None,
            error: Some(error),
            attempts: 1,
            duration_ms: 0,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Wall-clock timing is not part of a step's outcome and is ignored here.
impl PartialEq for ExecutionResult {
    fn eq(&self, other: &Self) -> bool {
        self.step_id == other.step_id
            && self.tool == other.tool
            && self.success == other.success
            && self.output == other.output
            && self.error == other.error
            && self.attempts == other.attempts
    }
}

/// Complete trace of one plan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRun {
    pub run_id: String,
    pub status: PlanStatus,
    /// One entry per attempted step, batch by batch, ascending id within a batch.
    pub results: Vec<ExecutionResult>,
    pub states: BTreeMap<StepId, StepState>,
    pub steps_run: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort: Option<AbortReason>,
}

impl PlanRun {
    pub fn result(&self, step_id: StepId) -> Option<&ExecutionResult> {
        self.results.iter().find(|result| result.step_id == step_id)
    }

    pub fn state(&self, step_id: StepId) -> Option<StepState> {
        self.states.get(&step_id).copied()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|result| result.success)
    }

    /// Share of attempted steps that succeeded; 0 when nothing ran.
    #[allow(clippy::cast_precision_loss)]
    pub fn success_ratio(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.succeeded().count() as f64 / self.results.len() as f64
    }
}
