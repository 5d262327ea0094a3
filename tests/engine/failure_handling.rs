use stepwise::{CoordinatorConfig, Plan, PlanStatus, Step, StepError, StepInput, StepState};

use crate::support::{Harness, fast_config};

fn isolation_plan() -> Plan {
    Plan::new(vec![
        Step::new(1, "broken", "a"),
        Step::new(2, "echo", "b")
            .depends_on(1)
            .with_input("value", StepInput::reference(1)),
        Step::new(3, "echo", "c").with_input("value", StepInput::literal("ok")),
    ])
}

#[tokio::test]
async fn always_failing_tool_is_tried_retry_attempts_plus_one_times() {
    let harness = Harness::new();
    let config = CoordinatorConfig {
        retry_attempts: 2,
        ..fast_config()
    };
    let plan = Plan::new(vec![Step::new(1, "broken", "a")]);

    let run = harness.coordinator(config).execute(&plan).await;
    assert_eq!(harness.broken_calls(), 3);
    let result = run.result(1).unwrap();
    assert_eq!(result.attempts, 3);
    assert!(matches!(result.error, Some(StepError::Tool(_))));
    assert_eq!(run.steps_run, 1);
    assert_eq!(run.status, PlanStatus::PartiallyCompleted);
}

#[tokio::test]
async fn failure_skips_dependents_but_not_siblings() {
    let harness = Harness::new();
    let run = harness
        .coordinator(fast_config())
        .execute(&isolation_plan())
        .await;

    assert_eq!(run.state(1), Some(StepState::Failed));
    assert_eq!(run.state(2), Some(StepState::Skipped));
    assert_eq!(run.state(3), Some(StepState::Succeeded));
    assert!(run.result(2).is_none());
    assert_eq!(run.status, PlanStatus::PartiallyCompleted);
    assert_eq!(run.steps_run, 2);
}

#[tokio::test]
async fn continue_on_failure_runs_dependents_anyway() {
    let harness = Harness::new();
    let config = CoordinatorConfig {
        continue_on_failure: true,
        ..fast_config()
    };
    let run = harness.coordinator(config).execute(&isolation_plan()).await;

    assert_eq!(run.state(1), Some(StepState::Failed));
    // The referenced output never landed, so step 2 fails on input resolution.
    assert_eq!(run.state(2), Some(StepState::Failed));
    assert!(matches!(
        run.result(2).unwrap().error,
        Some(StepError::UnresolvedInput { step: 1, .. })
    ));
    assert_eq!(run.state(3), Some(StepState::Succeeded));
    assert_eq!(run.steps_run, 3);
}

#[tokio::test]
async fn unknown_tool_is_permanent() {
    let plan = Plan::new(vec![Step::new(1, "teleport", "a")]);
    let run = Harness::new().coordinator(fast_config()).execute(&plan).await;
    let result = run.result(1).unwrap();
    assert_eq!(result.error, Some(StepError::ToolNotFound("teleport".into())));
    assert_eq!(result.attempts, 1);
}
