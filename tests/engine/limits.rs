use std::time::Duration;

use serde_json::json;
use stepwise::{AbortReason, CoordinatorConfig, Plan, PlanStatus, Step, StepError, StepInput, StepState};

use crate::support::{Harness, fast_config};

#[tokio::test]
async fn step_budget_aborts_after_exactly_max_steps() {
    let harness = Harness::new();
    let steps = (1..=25)
        .map(|id| Step::new(id, "echo", format!("step {id}")))
        .collect();
    let config = CoordinatorConfig {
        max_steps: 20,
        ..fast_config()
    };

    let run = harness.coordinator(config).execute(&Plan::new(steps)).await;
    assert_eq!(run.status, PlanStatus::Aborted);
    assert_eq!(run.abort, Some(AbortReason::StepBudget { max_steps: 20 }));
    assert_eq!(run.steps_run, 20);
    assert_eq!(harness.echo_calls(), 20);
    assert_eq!(run.results.len(), 20);
    let skipped = run
        .states
        .values()
        .filter(|state| **state == StepState::Skipped)
        .count();
    assert_eq!(skipped, 5);
}

#[tokio::test]
async fn plan_timeout_aborts_and_cancels() {
    let config = CoordinatorConfig {
        plan_timeout: Duration::from_millis(100),
        retry_attempts: 0,
        ..fast_config()
    };
    let plan = Plan::new(vec![
        Step::new(1, "sleep", "slow").with_input("ms", StepInput::literal(5_000)),
        Step::new(2, "echo", "after").depends_on(1),
    ]);

    let run = Harness::new().coordinator(config).execute(&plan).await;
    assert_eq!(run.status, PlanStatus::Aborted);
    assert!(matches!(run.abort, Some(AbortReason::PlanTimeout { .. })));
    assert_eq!(run.result(1).unwrap().error, Some(StepError::Cancelled));
    assert_eq!(run.state(2), Some(StepState::Skipped));
}

#[tokio::test]
async fn per_step_timeout_is_a_retryable_failure() {
    let config = CoordinatorConfig {
        per_step_timeout: Duration::from_millis(20),
        retry_attempts: 1,
        retry_backoff: Duration::ZERO,
        ..CoordinatorConfig::default()
    };
    let plan = Plan::new(vec![
        Step::new(1, "sleep", "slow").with_input("ms", StepInput::literal(1_000)),
        Step::new(2, "sleep", "quick").with_input("ms", StepInput::literal(1)),
    ]);

    let run = Harness::new().coordinator(config).execute(&plan).await;
    let slow = run.result(1).unwrap();
    assert_eq!(slow.error, Some(StepError::Timeout { after_ms: 20 }));
    assert_eq!(slow.attempts, 2);
    assert_eq!(run.result(2).unwrap().output, Some(json!(1)));
    assert_eq!(run.status, PlanStatus::PartiallyCompleted);
}

#[tokio::test]
async fn independent_steps_share_a_batch() {
    let config = CoordinatorConfig {
        per_step_timeout: Duration::from_secs(5),
        ..fast_config()
    };
    let plan = Plan::new(
        (1..=4)
            .map(|id| Step::new(id, "sleep", "nap").with_input("ms", StepInput::literal(150)))
            .collect(),
    );

    let started = std::time::Instant::now();
    let run = Harness::new().coordinator(config).execute(&plan).await;
    assert_eq!(run.status, PlanStatus::Completed);
    assert!(started.elapsed() < Duration::from_millis(550));
}
