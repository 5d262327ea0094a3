use super::types::{Plan, Step, StepId, StepInput};
use crate::analysis::{QuestionAnalysis, QuestionType};
use std::collections::BTreeSet;
use std::path::Path;

/// Turns a [`QuestionAnalysis`] into a concrete plan over the tools that
/// are actually registered.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    available: BTreeSet<String>,
}

impl PlanBuilder {
    pub fn new<I, S>(available_tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: available_tools.into_iter().map(Into::into).collect(),
        }
    }

    fn has(&self, tool: &str) -> bool {
        self.available.contains(tool)
    }

    /// Attachments are read first (and `.py` files executed), then a web
    /// search for research questions, then any arithmetic found in the
    /// question. Ids ascend from 1.
    pub fn build(&self, question: &str, analysis: &QuestionAnalysis) -> Plan {
        let mut steps = Vec::new();
        let mut next_id: StepId = 1;
        let mut allocate = || {
            let id = next_id;
            next_id += 1;
            id
        };

        for attachment in &analysis.attachments {
            if !self.has("file_handler") {
                break;
            }
            let read_id = allocate();
            steps.push(
                Step::new(read_id, "file_handler", format!("Read {attachment}"))
                    .with_input("file_path", StepInput::literal(attachment.as_str()))
                    .with_input("operation", StepInput::literal("read")),
            );

            let is_python = Path::new(attachment)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("py"));
            if is_python && self.has("code_executor") {
                steps.push(
                    Step::new(allocate(), "code_executor", format!("Run {attachment}"))
                        .depends_on(read_id)
                        .with_input("code", StepInput::reference(read_id))
                        .with_input("language", StepInput::literal("python")),
                );
            }
        }

        if matches!(
            analysis.question_type,
            QuestionType::Research | QuestionType::MultiStep
        ) && self.has("web_search")
        {
            steps.push(
                Step::new(allocate(), "web_search", "Search the web")
                    .with_input("query", StepInput::literal(question.trim())),
            );
        }

        if let Some(expression) = &analysis.expression
            && self.has("calculator")
        {
            steps.push(
                Step::new(allocate(), "calculator", format!("Evaluate {expression}"))
                    .with_input("expression", StepInput::literal(expression.as_str())),
            );
        }

        tracing::debug!(steps = steps.len(), "planner.built");
        Plan::new(steps)
    }
}
