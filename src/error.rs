use crate::planner::StepId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `stepwise`.
///
/// Structural plan problems and configuration problems surface here. Step
/// level failures never unwind: they are captured as [`StepError`] inside an
/// execution result and decided upon by the coordinator.
#[derive(Debug, Error)]
pub enum StepwiseError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Plan structure ──────────────────────────────────────────────────
    #[error("plan: {0}")]
    Plan(#[from] PlanError),

    // ── Step execution ──────────────────────────────────────────────────
    #[error("step: {0}")]
    Step(#[from] StepError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Plan errors ─────────────────────────────────────────────────────────────

/// Structural problems with a plan. Always fatal to the run, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PlanError {
    #[error("cycle detected: {}", join_ids(.path))]
    Cycle { path: Vec<StepId> },

    #[error("duplicate step id: {0}")]
    DuplicateStepId(StepId),

    #[error("step {step} depends on unknown step {dependency}")]
    MissingDependency { step: StepId, dependency: StepId },

    #[error("no runnable step among pending steps [{}]", join_ids(.pending))]
    Unschedulable { pending: Vec<StepId> },
}

// ─── Step errors ─────────────────────────────────────────────────────────────

/// Why a single step attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    #[error("input '{parameter}' references unavailable output of step {step}")]
    UnresolvedInput { parameter: String, step: StepId },

    #[error("tool {0} not found")]
    ToolNotFound(String),

    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("tool failed: {0}")]
    Tool(String),

    #[error("cancelled by plan-level limit")]
    Cancelled,
}

impl StepError {
    /// Transient failures are retried by the coordinator; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Tool(_))
    }
}

fn join_ids(ids: &[StepId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, StepwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = StepwiseError::Config(ConfigError::Validation("max_steps must be > 0".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn cycle_error_lists_path() {
        let err = PlanError::Cycle {
            path: vec![1, 2, 1],
        };
        assert_eq!(err.to_string(), "cycle detected: 1 -> 2 -> 1");
    }

    #[test]
    fn missing_dependency_names_both_steps() {
        let err = PlanError::MissingDependency {
            step: 4,
            dependency: 9,
        };
        assert_eq!(err.to_string(), "step 4 depends on unknown step 9");
    }

    #[test]
    fn only_timeout_and_tool_errors_are_retryable() {
        assert!(StepError::Timeout { after_ms: 10 }.is_retryable());
        assert!(StepError::Tool("boom".into()).is_retryable());
        assert!(!StepError::ToolNotFound("x".into()).is_retryable());
        assert!(
            !StepError::UnresolvedInput {
                parameter: "value".into(),
                step: 1
            }
            .is_retryable()
        );
        assert!(!StepError::Cancelled.is_retryable());
    }

    #[test]
    fn step_error_serializes_with_kind_tag() {
        let value = serde_json::to_value(StepError::Timeout { after_ms: 250 }).unwrap();
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["detail"]["after_ms"], 250);
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: StepwiseError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }
}
