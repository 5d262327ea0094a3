use super::traits::{Tool, ToolSpec};
use crate::error::StepError;
use std::collections::HashMap;
use std::sync::Arc;

/// Central registry for tool instances.
///
/// Populated once at startup, then shared read-only behind an `Arc` by every
/// step that runs concurrently.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Last write wins: a tool with the same name is
    /// replaced (and returned) but keeps its original listing position.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        let name = tool.name().to_string();
        let previous = self.tools.insert(name.clone(), tool);
        if previous.is_none() {
            self.order.push(name);
        } else {
            tracing::debug!(tool = %name, "tool.replaced");
        }
        previous
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, StepError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| StepError::ToolNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Specs in registration order.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    /// Names in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
