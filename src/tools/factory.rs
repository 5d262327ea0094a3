use super::{CalculatorTool, CodeExecutorTool, FileHandlerTool, ToolRegistry, WebSearchTool};
use crate::config::ToolsConfig;
use std::time::Duration;

/// Build the registry from config.
///
/// The calculator is always available; the other tools follow their
/// `enabled` flag. Registration order is the listing order.
pub fn build_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    if config.web_search.enabled {
        registry.register(Box::new(WebSearchTool::new(
            config.web_search.endpoint.clone(),
            config.web_search.api_key.clone(),
            config.web_search.num_results,
        )));
    }

    if config.code_executor.enabled {
        registry.register(Box::new(CodeExecutorTool::new(
            config.code_executor.interpreter.clone(),
            Duration::from_secs(config.code_executor.timeout_secs),
        )));
    }

    if config.file_handler.enabled {
        registry.register(Box::new(FileHandlerTool::new(
            config.file_handler.max_file_size,
        )));
    }

    registry.register(Box::new(CalculatorTool::new()));

    tracing::debug!(tools = ?registry.tool_names(), "tools.registered");
    registry
}
