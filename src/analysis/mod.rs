//! Heuristic question analysis: classify a question, pull out entities and
//! decide which tools a plan will need.

use crate::tools::calculator;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Calculation,
    Research,
    CodeAnalysis,
    DataAnalysis,
    Reasoning,
    MultiStep,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Calculation => "calculation",
            Self::Research => "research",
            Self::CodeAnalysis => "code_analysis",
            Self::DataAnalysis => "data_analysis",
            Self::Reasoning => "reasoning",
            Self::MultiStep => "multi_step",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Numeric,
    List,
    Boolean,
    Text,
}

/// What the planner needs to know about a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub question_type: QuestionType,
    pub key_entities: Vec<String>,
    pub required_tools: BTreeSet<String>,
    pub complexity: Complexity,
    pub answer_type: AnswerType,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Arithmetic expression found in the question, digit grouping removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["“]([^"”]+)["”]"#).expect("valid quoted regex"));
static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][\w'-]*(?:\s+(?:of\s+|the\s+)?[A-Z][\w'-]*)*").expect("valid name regex")
});
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\b\d[\d,]*(?:\.\d+)?\b").expect("valid number regex"));
static EXPRESSION_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?:sqrt|log10|log|sin|cos|tan|exp|abs|round|floor|ceil|pow|min|max)\s*\(|\*\*|[-+*/^%×÷().,\d\s])+",
    )
    .expect("valid expression regex")
});
static DIGIT_GROUPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,3}(?:,\d{3})+\b").expect("valid grouping regex"));
static BINARY_OPERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\d)]\s*(?:\*\*|[-+*/^%×÷])\s*[-\d(a-z]").expect("valid operator regex")
});

const LEADING_STOPWORDS: &[&str] = &[
    "What", "Who", "Whom", "Whose", "When", "Where", "Which", "Why", "How", "Is", "Are", "Was",
    "Were", "Do", "Does", "Did", "Can", "Could", "The", "A", "An", "In", "On", "If", "Please",
    "Calculate", "Compute", "Find", "List", "Name", "Give", "Tell",
];
const RESEARCH_CUES: &[&str] = &[
    "who ", "when ", "where ", "what year", "which country", "which city", "won ", "capital",
    "founded", "invented", "discovered", "born", "author", "published", "president", "according to",
    "wikipedia", "latest", "current",
];
const CALCULATION_CUES: &[&str] = &[
    "calculate", "compute", "sum ", "sum of", "product of", "difference", "total", "average",
    "mean", "median", "percent", "%", "how many", "how much", "multiply", "divide", "square root",
    "prime", "factorial", "equation", "solve for",
];
const CODE_CUES: &[&str] = &["code", "python", "script", "program", "function", "output of"];
const DATA_CUES: &[&str] = &["csv", "spreadsheet", "dataset", "table", "column", " rows", "excel"];
const BOOLEAN_OPENERS: &[&str] = &[
    "is", "are", "was", "were", "does", "do", "did", "can", "could", "has", "have", "had", "will",
    "would", "should",
];
const LIST_CUES: &[&str] = &[
    "list ", "name all", "which ones", "what are the", "enumerate", "comma-separated",
    "comma separated",
];
const NUMERIC_CUES: &[&str] = &[
    "how many", "how much", "what is the sum", "what is the total", "what is the average",
    "what is the number", "what percentage", "calculate", "compute",
];
const DATA_EXTENSIONS: &[&str] = &["csv", "json", "xlsx", "xls"];

/// Rule-based analyzer; no model calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionAnalyzer;

impl QuestionAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, question: &str, attachments: &[String]) -> QuestionAnalysis {
        let lower = question.to_lowercase();
        let extensions = attachments
            .iter()
            .filter_map(|path| {
                Path::new(path)
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
            })
            .collect::<BTreeSet<_>>();

        let expression = extract_expression(question);
        let question_type = classify(&lower, &extensions, expression.is_some());
        let key_entities = extract_entities(question);
        let required_tools = required_tools(question_type, !attachments.is_empty());
        let complexity = estimate_complexity(&lower, &key_entities, attachments.len(), question_type);
        let answer_type = answer_type(&lower, question_type);

        tracing::debug!(
            question_type = %question_type,
            entities = key_entities.len(),
            tools = ?required_tools,
            "analysis.completed"
        );

        QuestionAnalysis {
            question_type,
            key_entities,
            required_tools,
            complexity,
            answer_type,
            attachments: attachments.to_vec(),
            expression,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn classify(lower: &str, extensions: &BTreeSet<String>, has_expression: bool) -> QuestionType {
    if extensions.contains("py") || (extensions.is_empty() && contains_any(lower, CODE_CUES)) {
        return QuestionType::CodeAnalysis;
    }
    if extensions
        .iter()
        .any(|ext| DATA_EXTENSIONS.contains(&ext.as_str()))
        || contains_any(lower, DATA_CUES)
    {
        return QuestionType::DataAnalysis;
    }

    let padded = format!(" {lower}");
    let research = contains_any(&padded, RESEARCH_CUES);
    let calculation = has_expression || contains_any(&padded, CALCULATION_CUES);
    match (research, calculation) {
        (true, true) => QuestionType::MultiStep,
        (true, false) => QuestionType::Research,
        (false, true) => QuestionType::Calculation,
        (false, false) if clause_count(lower) >= 3 => QuestionType::MultiStep,
        (false, false) => QuestionType::Reasoning,
    }
}

fn required_tools(question_type: QuestionType, has_attachments: bool) -> BTreeSet<String> {
    let tools: &[&str] = match question_type {
        QuestionType::Calculation => &["calculator"],
        QuestionType::Research => &["web_search"],
        QuestionType::CodeAnalysis => &["code_executor"],
        QuestionType::DataAnalysis => &["calculator", "file_handler"],
        QuestionType::MultiStep => &["web_search", "calculator"],
        QuestionType::Reasoning => &[],
    };
    let mut required = tools.iter().map(ToString::to_string).collect::<BTreeSet<_>>();
    if has_attachments {
        required.insert("file_handler".into());
    }
    required
}

/// Quoted phrases, capitalised name runs, then numbers; first occurrence wins.
pub fn extract_entities(question: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut entities = Vec::new();
    let mut push = |entity: &str| {
        let entity = entity.trim().trim_end_matches(|c: char| c == ',' || c == '.');
        if !entity.is_empty() && seen.insert(entity.to_lowercase()) {
            entities.push(entity.to_string());
        }
    };

    for capture in QUOTED.captures_iter(question) {
        if let Some(phrase) = capture.get(1) {
            push(phrase.as_str());
        }
    }
    for run in CAPITALIZED_RUN.find_iter(question) {
        let words = run.as_str().split_whitespace().collect::<Vec<_>>();
        let start = words
            .iter()
            .position(|word| !LEADING_STOPWORDS.contains(word))
            .unwrap_or(words.len());
        if start < words.len() {
            push(&words[start..].join(" "));
        }
    }
    for number in NUMBER.find_iter(question) {
        push(number.as_str());
    }
    entities
}

/// Longest span of the question that is a valid arithmetic expression with
/// at least one binary operator.
pub fn extract_expression(question: &str) -> Option<String> {
    EXPRESSION_CANDIDATE
        .find_iter(&question.to_lowercase())
        .map(|candidate| {
            candidate
                .as_str()
                .trim()
                .trim_end_matches(['.', ','])
                .trim()
                .to_string()
        })
        .filter(|candidate| BINARY_OPERATION.is_match(candidate))
        .filter_map(|candidate| {
            if calculator::evaluate(&candidate).is_ok() {
                return Some(candidate);
            }
            let ungrouped = strip_digit_grouping(&candidate);
            calculator::evaluate(&ungrouped).is_ok().then_some(ungrouped)
        })
        .max_by_key(String::len)
}

/// `1,000,000` becomes `1000000`; argument lists like `max(1,2)` are untouched.
fn strip_digit_grouping(candidate: &str) -> String {
    DIGIT_GROUPED
        .replace_all(candidate, |caps: &regex::Captures<'_>| caps[0].replace(',', ""))
        .into_owned()
}

fn clause_count(lower: &str) -> usize {
    1 + lower.matches(", ").count()
        + lower.matches(" and ").count()
        + lower.matches(" then ").count()
        + lower.matches("; ").count()
}

fn estimate_complexity(
    lower: &str,
    entities: &[String],
    attachments: usize,
    question_type: QuestionType,
) -> Complexity {
    let mut score = entities.len() + clause_count(lower) + attachments * 2;
    if question_type == QuestionType::MultiStep {
        score += 2;
    }
    match score {
        0..=3 => Complexity::Low,
        4..=6 => Complexity::Medium,
        _ => Complexity::High,
    }
}

fn answer_type(lower: &str, question_type: QuestionType) -> AnswerType {
    let first_word = lower.split_whitespace().next().unwrap_or_default();
    if BOOLEAN_OPENERS.contains(&first_word) {
        return AnswerType::Boolean;
    }
    if contains_any(lower, LIST_CUES) {
        return AnswerType::List;
    }
    if contains_any(lower, NUMERIC_CUES) || question_type == QuestionType::Calculation {
        return AnswerType::Numeric;
    }
    AnswerType::Text
}
