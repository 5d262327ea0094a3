use serde_json::json;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stepwise::{Config, PlanStatus, Solver};

const QUESTION: &str = "Who won the Nobel Prize in Physics in 2022?";

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.tools.web_search.endpoint = server.uri();
    config.tools.code_executor.enabled = false;
    config.execution.retry_attempts = 1;
    config.execution.retry_backoff_ms = 0;
    config.observability.backend = "none".into();
    config
}

#[tokio::test]
async fn research_question_is_answered_from_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", QUESTION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "2022 Nobel Prize in Physics",
            "AbstractText": "Alain Aspect, John Clauser and Anton Zeilinger.",
            "AbstractURL": "https://example.org/nobel-2022",
            "RelatedTopics": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let solver = Solver::from_config(&config_for(&server)).unwrap();
    let report = solver.solve(QUESTION, &[]).await;

    assert_eq!(report.status, Some(PlanStatus::Completed));
    assert_eq!(
        report.answer.as_deref(),
        Some("Alain Aspect, John Clauser and Anton Zeilinger.")
    );
    assert_eq!(report.execution_log.len(), 1);
    assert_eq!(report.execution_log[0].tool, "web_search");
    assert!(report.explanation.ends_with("Plan status: completed"));
}

#[tokio::test]
async fn failing_search_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let solver = Solver::from_config(&config_for(&server)).unwrap();
    let report = solver.solve(QUESTION, &[]).await;

    assert_eq!(report.answer, None);
    assert!(report.confidence.abs() < f64::EPSILON);
    assert_eq!(report.status, Some(PlanStatus::PartiallyCompleted));
    let entry = &report.execution_log[0];
    assert!(!entry.success);
    assert_eq!(entry.attempts, 2);
    assert!(entry.error.as_deref().unwrap_or_default().contains("HTTP 503"));
}
