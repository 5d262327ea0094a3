use crate::engine::CoordinatorConfig;
use crate::error::ConfigError;
use crate::tools::{DEFAULT_MAX_FILE_SIZE, DEFAULT_SEARCH_ENDPOINT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where this config was loaded from; not persisted.
    #[serde(skip)]
    pub config_path: PathBuf,
    pub execution: ExecutionConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
}

// ── Execution ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Hard cap on steps executed per plan run
    pub max_steps: usize,
    pub step_timeout_secs: u64,
    pub plan_timeout_secs: u64,
    /// Extra attempts after the first failure (timeouts and tool errors only)
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub continue_on_failure: bool,
    /// Parallel steps per batch; 0 means unbounded
    pub max_concurrency: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            step_timeout_secs: 30,
            plan_timeout_secs: 300,
            retry_attempts: 3,
            retry_backoff_ms: 200,
            continue_on_failure: false,
            max_concurrency: 0,
        }
    }
}

impl From<&ExecutionConfig> for CoordinatorConfig {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            per_step_timeout: Duration::from_secs(config.step_timeout_secs),
            plan_timeout: Duration::from_secs(config.plan_timeout_secs),
            retry_attempts: config.retry_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            continue_on_failure: config.continue_on_failure,
            max_concurrency: config.max_concurrency,
        }
    }
}

// ── Tools ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub web_search: WebSearchConfig,
    pub code_executor: CodeExecutorConfig,
    pub file_handler: FileHandlerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub num_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            endpoint: DEFAULT_SEARCH_ENDPOINT.into(),
            num_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeExecutorConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub interpreter: String,
}

impl Default for CodeExecutorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 30,
            interpreter: "python3".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHandlerConfig {
    pub enabled: bool,
    /// Bytes
    pub max_file_size: u64,
}

impl Default for FileHandlerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

// ── Logging / observability ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    pub level: String,
    /// Append logs here instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// "none" | "log"
    pub backend: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: "log".into(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let execution = &self.execution;
        if execution.max_steps == 0 {
            return Err(ConfigError::Validation(
                "execution.max_steps must be at least 1".into(),
            ));
        }
        if execution.step_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "execution.step_timeout_secs must be greater than 0".into(),
            ));
        }
        if execution.plan_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "execution.plan_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.tools.code_executor.enabled && self.tools.code_executor.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tools.code_executor.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.tools.web_search.enabled && self.tools.web_search.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tools.web_search.endpoint must not be empty".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::from(&self.execution)
    }
}
