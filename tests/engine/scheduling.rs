use std::collections::BTreeSet;

use stepwise::{
    AbortReason, Plan, PlanError, PlanStatus, Step, StepInput, StepState,
};

use crate::support::{Harness, fast_config};

fn diamond() -> Plan {
    Plan::new(vec![
        Step::new(1, "echo", "root").with_input("value", StepInput::literal(1)),
        Step::new(2, "echo", "left").depends_on(1),
        Step::new(3, "echo", "right").depends_on(1),
        Step::new(4, "echo", "join").depends_on(2).depends_on(3),
    ])
}

#[test]
fn layers_partition_the_plan_in_dependency_order() {
    let plan = diamond();
    let layers = plan.topological_layers().unwrap();
    assert_eq!(
        layers,
        vec![
            BTreeSet::from([1]),
            BTreeSet::from([2, 3]),
            BTreeSet::from([4]),
        ]
    );

    let mut seen = BTreeSet::new();
    for layer in &layers {
        for id in layer {
            assert!(seen.insert(*id), "step {id} appears in two layers");
            let step = plan.step(*id).unwrap();
            assert!(step.dependencies.iter().all(|dep| seen.contains(dep)));
        }
    }
    assert_eq!(seen, plan.step_ids().collect());
}

#[tokio::test]
async fn results_follow_batch_then_id_order() {
    let harness = Harness::new();
    let run = harness.coordinator(fast_config()).execute(&diamond()).await;
    assert_eq!(run.status, PlanStatus::Completed);
    let order = run.results.iter().map(|r| r.step_id).collect::<Vec<_>>();
    assert_eq!(order, vec![1, 2, 3, 4]);
    assert_eq!(run.steps_run, 4);
    assert_eq!(harness.echo_calls(), 4);
}

#[tokio::test]
async fn cyclic_plan_is_rejected_before_any_step_runs() {
    let harness = Harness::new();
    let plan = Plan::new(vec![
        Step::new(1, "echo", "free"),
        Step::new(2, "echo", "a").depends_on(3),
        Step::new(3, "echo", "b").depends_on(2),
    ]);

    let run = harness.coordinator(fast_config()).execute(&plan).await;
    assert_eq!(run.status, PlanStatus::Aborted);
    assert!(matches!(
        run.abort,
        Some(AbortReason::Invalid {
            error: PlanError::Cycle { .. }
        })
    ));
    assert_eq!(harness.echo_calls(), 0);
    assert_eq!(run.steps_run, 0);
    assert!(run.results.is_empty());
    assert!(run.states.values().all(|state| *state == StepState::Skipped));
}

#[tokio::test]
async fn dangling_dependency_is_rejected() {
    let harness = Harness::new();
    let plan = Plan::new(vec![Step::new(1, "echo", "a"), Step::new(2, "echo", "b").depends_on(9)]);

    let run = harness.coordinator(fast_config()).execute(&plan).await;
    assert_eq!(
        run.abort,
        Some(AbortReason::Invalid {
            error: PlanError::MissingDependency {
                step: 2,
                dependency: 9
            }
        })
    );
    assert_eq!(harness.echo_calls(), 0);
}

#[tokio::test]
async fn duplicate_ids_are_rejected() {
    let harness = Harness::new();
    let plan = Plan::new(vec![Step::new(1, "echo", "a"), Step::new(1, "echo", "b")]);
    let run = harness.coordinator(fast_config()).execute(&plan).await;
    assert_eq!(
        run.abort,
        Some(AbortReason::Invalid {
            error: PlanError::DuplicateStepId(1)
        })
    );
}

#[tokio::test]
async fn identical_runs_produce_identical_results() {
    let plan = diamond();
    let first = Harness::new().coordinator(fast_config()).execute(&plan).await;
    let second = Harness::new().coordinator(fast_config()).execute(&plan).await;
    assert_eq!(first.status, second.status);
    assert_eq!(first.results, second.results);
    assert_eq!(first.states, second.states);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn plan_loaded_from_json_runs() {
    let raw = r#"{
        "steps": [
            {"id": 1, "tool": "echo", "inputs": {"value": {"n": 42}}},
            {"id": 2, "tool": "echo", "dependencies": [1],
             "inputs": {"value": {"$step": 1, "pointer": "/n"}}}
        ]
    }"#;
    let plan = Plan::from_json(raw).unwrap();
    let run = Harness::new().coordinator(fast_config()).execute(&plan).await;
    assert_eq!(run.status, PlanStatus::Completed);
    assert_eq!(run.result(2).unwrap().output, Some(serde_json::json!(42)));
}
