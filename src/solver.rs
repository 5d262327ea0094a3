use crate::analysis::QuestionAnalyzer;
use crate::answer::AnswerGenerator;
use crate::config::Config;
use crate::engine::{CoordinatorConfig, ExecutionCoordinator, ExecutionResult, PlanRun, PlanStatus};
use crate::error::Result;
use crate::observability::{Observer, create_observer};
use crate::planner::{Plan, PlanBuilder, StepId};
use crate::tools::{ToolRegistry, ToolSpec, build_registry};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Longest output excerpt kept per execution log entry.
const LOG_OUTPUT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step_id: StepId,
    pub tool: String,
    pub success: bool,
    pub attempts: u32,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ExecutionResult> for LogEntry {
    fn from(result: &ExecutionResult) -> Self {
        let output = match &result.output {
            None => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };
        Self {
            step_id: result.step_id,
            tool: result.tool.clone(),
            success: result.success,
            attempts: result.attempts,
            output: output.chars().take(LOG_OUTPUT_CHARS).collect(),
            error: result.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Everything a caller gets back from [`Solver::solve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub answer: Option<String>,
    pub explanation: String,
    pub confidence: f64,
    /// Absent when the pipeline failed before a plan ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
    pub execution_log: Vec<LogEntry>,
}

impl SolveReport {
    fn from_error(error: &crate::error::StepwiseError) -> Self {
        Self {
            answer: None,
            explanation: format!("Error occurred: {error}"),
            confidence: 0.0,
            status: None,
            execution_log: Vec::new(),
        }
    }
}

/// End-to-end pipeline: analyze, plan, execute, answer.
pub struct Solver {
    analyzer: QuestionAnalyzer,
    coordinator: ExecutionCoordinator,
    answers: AnswerGenerator,
}

impl Solver {
    pub fn new(registry: Arc<ToolRegistry>, config: CoordinatorConfig) -> Self {
        Self {
            analyzer: QuestionAnalyzer::new(),
            coordinator: ExecutionCoordinator::new(registry, config),
            answers: AnswerGenerator::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(build_registry(&config.tools));
        let observer: Arc<dyn Observer> = Arc::from(create_observer(&config.observability));
        Ok(Self::new(registry, config.coordinator_config()).with_observer(observer))
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.coordinator = self.coordinator.with_observer(observer);
        self
    }

    /// Registered tools in registration order.
    pub fn tools(&self) -> Vec<ToolSpec> {
        self.coordinator.registry().list()
    }

    /// Never fails; pipeline errors come back as a zero-confidence report.
    pub async fn solve(&self, question: &str, attachments: &[String]) -> SolveReport {
        let preview = question.chars().take(100).collect::<String>();
        tracing::info!(question = %preview, "solve.start");
        match self.try_solve(question, attachments).await {
            Ok(report) => {
                tracing::info!(answer = ?report.answer, confidence = report.confidence, "solve.finish");
                report
            }
            Err(error) => {
                tracing::error!(error = %error, "solve.failed");
                SolveReport::from_error(&error)
            }
        }
    }

    async fn try_solve(&self, question: &str, attachments: &[String]) -> Result<SolveReport> {
        if question.trim().is_empty() {
            return Err(anyhow!("question must not be empty").into());
        }
        if let Some(missing) = attachments.iter().find(|path| !Path::new(path).exists()) {
            return Err(anyhow!("attachment not found: {missing}").into());
        }

        let analysis = self.analyzer.analyze(question, attachments);
        tracing::info!(question_type = %analysis.question_type, "solve.analyzed");

        let plan = PlanBuilder::new(self.coordinator.registry().tool_names())
            .build(question, &analysis);
        plan.validate()?;
        tracing::info!(steps = plan.len(), "solve.planned");

        let run = self.coordinator.execute(&plan).await;
        let answer = self.answers.generate(question, &run, analysis.answer_type);

        Ok(SolveReport {
            answer: answer.answer,
            explanation: answer.explanation,
            confidence: answer.confidence,
            status: Some(run.status),
            execution_log: run.results.iter().map(LogEntry::from).collect(),
        })
    }

    /// Execute an explicit plan, bypassing analysis and planning.
    pub async fn run_plan(&self, plan: &Plan) -> PlanRun {
        self.coordinator.execute(plan).await
    }
}
