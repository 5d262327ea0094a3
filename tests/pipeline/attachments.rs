use std::fs;

use stepwise::{Config, PlanStatus, Solver};

fn offline_config() -> Config {
    let mut config = Config::default();
    config.tools.web_search.enabled = false;
    config.execution.retry_backoff_ms = 0;
    config.observability.backend = "none".into();
    config
}

#[tokio::test]
async fn text_attachment_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "The meeting moved to Thursday.\n").unwrap();

    let solver = Solver::from_config(&offline_config()).unwrap();
    let report = solver
        .solve(
            "When is the meeting according to the notes?",
            &[path.to_string_lossy().into_owned()],
        )
        .await;

    assert_eq!(report.status, Some(PlanStatus::Completed));
    assert_eq!(report.answer.as_deref(), Some("The meeting moved to Thursday."));
}

#[cfg(unix)]
#[tokio::test]
async fn script_attachment_is_read_then_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("answer.py");
    fs::write(&path, "echo 42\n").unwrap();

    let mut config = offline_config();
    config.tools.code_executor.interpreter = "sh".into();
    let solver = Solver::from_config(&config).unwrap();
    let report = solver
        .solve(
            "How many answers does this script print?",
            &[path.to_string_lossy().into_owned()],
        )
        .await;

    assert_eq!(report.status, Some(PlanStatus::Completed));
    let tools = report
        .execution_log
        .iter()
        .map(|entry| entry.tool.as_str())
        .collect::<Vec<_>>();
    assert_eq!(tools, vec!["file_handler", "code_executor"]);
    assert_eq!(report.answer.as_deref(), Some("42"));
}

#[tokio::test]
async fn oversized_attachment_fails_the_read_step() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.txt");
    fs::write(&path, "x".repeat(64)).unwrap();

    let mut config = offline_config();
    config.tools.file_handler.max_file_size = 16;
    config.execution.retry_attempts = 0;
    let solver = Solver::from_config(&config).unwrap();
    let report = solver
        .solve("Summarize the file", &[path.to_string_lossy().into_owned()])
        .await;

    assert_eq!(report.answer, None);
    let error = report.execution_log[0].error.as_deref().unwrap_or_default();
    assert!(error.contains("File too large"), "{error}");
}
