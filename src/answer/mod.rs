//! Turns a finished plan run into a formatted answer, a step-by-step
//! explanation and a confidence score.

use crate::analysis::AnswerType;
use crate::engine::{ExecutionResult, PlanRun, PlanStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;

/// Longest output excerpt quoted in an explanation line.
const EXPLANATION_EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: Option<String>,
    pub explanation: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerGenerator;

impl AnswerGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, question: &str, run: &PlanRun, answer_type: AnswerType) -> Answer {
        // Dependents always finish after their dependencies, so the last
        // success is never consumed by a later successful step.
        let answer = run
            .results
            .iter()
            .rev()
            .find(|result| result.success)
            .and_then(|result| result.output.as_ref())
            .map(|output| format_answer(output, answer_type))
            .filter(|answer| !answer.is_empty());

        let confidence = if answer.is_some() {
            (run.success_ratio() * status_weight(run.status)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        tracing::debug!(
            question = %truncate_chars(question, 80),
            answered = answer.is_some(),
            confidence = confidence,
            "answer.generated"
        );

        Answer {
            answer,
            explanation: explain(run),
            confidence,
        }
    }
}

fn status_weight(status: PlanStatus) -> f64 {
    match status {
        PlanStatus::Completed => 1.0,
        PlanStatus::PartiallyCompleted => 0.6,
        PlanStatus::Aborted => 0.3,
    }
}

/// Render `value` as the requested answer type, falling back to text when
/// the value does not fit.
pub fn format_answer(value: &Value, answer_type: AnswerType) -> String {
    match answer_type {
        AnswerType::Numeric => as_number(value).map_or_else(|| format_text(value), format_number),
        AnswerType::Boolean => as_bool(value).map_or_else(
            || format_text(value),
            |flag| if flag { "yes" } else { "no" }.to_string(),
        ),
        AnswerType::List => format_list(value),
        AnswerType::Text => format_text(value),
    }
}

/// No thousands separators; at most six decimals with trailing zeros trimmed.
pub fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        return format!("{number:.0}");
    }
    let fixed = format!("{number:.6}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".into()
    } else {
        trimmed.to_string()
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_number(text),
        Value::Object(map) => map.get("stdout").and_then(Value::as_str).and_then(|out| {
            out.lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .and_then(parse_number)
        }),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.trim().replace(',', "");
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|n| n != 0.0),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        Value::Object(map) => map
            .get("stdout")
            .filter(|out| out.is_string())
            .and_then(as_bool),
        _ => None,
    }
}

fn format_list(value: &Value) -> String {
    let items = match value {
        Value::Array(items) => items.iter().map(format_text).collect::<Vec<_>>(),
        Value::String(text) => text
            .split(['\n', ','])
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToString::to_string)
            .collect(),
        other => vec![format_text(other)],
    };
    items.join(", ")
}

/// Strings unquoted; program output as its stdout; search hits as the
/// first snippet; anything else as compact JSON.
fn format_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.as_f64().map_or_else(|| number.to_string(), format_number),
        Value::Bool(flag) => flag.to_string(),
        Value::Object(map) if map.contains_key("stdout") => map
            .get("stdout")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        Value::Object(map) if map.contains_key("snippet") => map
            .get("snippet")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        Value::Array(items) if items.first().is_some_and(|first| first.get("snippet").is_some()) => {
            format_text(&items[0])
        }
        other => other.to_string(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

fn describe(result: &ExecutionResult) -> String {
    if result.success {
        let output = result.output.as_ref().map(format_text).unwrap_or_default();
        format!(
            "Step {} ({}) succeeded: {}",
            result.step_id,
            result.tool,
            truncate_chars(&output, EXPLANATION_EXCERPT_CHARS)
        )
    } else {
        let error = result
            .error
            .as_ref()
            .map_or_else(|| "unknown error".to_string(), ToString::to_string);
        format!("Step {} ({}) failed: {error}", result.step_id, result.tool)
    }
}

fn explain(run: &PlanRun) -> String {
    let mut explanation = String::new();
    for (index, result) in run.results.iter().enumerate() {
        let _ = writeln!(explanation, "{}. {}", index + 1, describe(result));
    }
    let _ = write!(explanation, "Plan status: {}", run.status);
    if let Some(reason) = &run.abort {
        let _ = write!(explanation, " ({reason})");
    }
    explanation
}
