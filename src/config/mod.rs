mod env_overrides;
mod loader;
pub mod schema;
#[cfg(test)]
mod test_env;

pub use schema::{
    CodeExecutorConfig, Config, ExecutionConfig, FileHandlerConfig, LoggingConfig,
    ObservabilityConfig, ToolsConfig, WebSearchConfig,
};
