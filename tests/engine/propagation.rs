use serde_json::json;

use stepwise::{Plan, PlanStatus, Step, StepError, StepInput, StepState};

use crate::support::{Harness, fast_config};

#[tokio::test]
async fn dependent_receives_dependency_output() {
    let plan = Plan::new(vec![
        Step::new(1, "echo", "produce").with_input("value", StepInput::literal(42)),
        Step::new(2, "echo", "consume")
            .depends_on(1)
            .with_input("value", StepInput::reference(1)),
    ]);

    let run = Harness::new().coordinator(fast_config()).execute(&plan).await;
    assert_eq!(run.status, PlanStatus::Completed);
    assert_eq!(run.result(2).unwrap().output, Some(json!(42)));
}

#[tokio::test]
async fn pointer_narrows_a_structured_output() {
    let plan = Plan::new(vec![
        Step::new(1, "echo", "produce")
            .with_input("value", StepInput::literal(json!({"rows": [{"total": 7}]}))),
        Step::new(2, "echo", "consume")
            .depends_on(1)
            .with_input("value", StepInput::reference_at(1, "/rows/0/total")),
    ]);

    let run = Harness::new().coordinator(fast_config()).execute(&plan).await;
    assert_eq!(run.result(2).unwrap().output, Some(json!(7)));
}

#[tokio::test]
async fn bad_pointer_fails_without_retrying() {
    let harness = Harness::new();
    let plan = Plan::new(vec![
        Step::new(1, "echo", "produce").with_input("value", StepInput::literal(json!({}))),
        Step::new(2, "echo", "consume")
            .depends_on(1)
            .with_input("value", StepInput::reference_at(1, "/missing")),
    ]);

    let run = harness.coordinator(fast_config()).execute(&plan).await;
    let failed = run.result(2).unwrap();
    assert_eq!(
        failed.error,
        Some(StepError::UnresolvedInput {
            parameter: "value".into(),
            step: 1
        })
    );
    assert_eq!(failed.attempts, 1);
    assert_eq!(run.state(2), Some(StepState::Failed));
    assert_eq!(harness.echo_calls(), 1);
    assert_eq!(run.status, PlanStatus::PartiallyCompleted);
}
