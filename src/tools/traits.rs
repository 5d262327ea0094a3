use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Resolved inputs handed to a tool: parameter name -> value.
pub type ToolInputs = serde_json::Map<String, Value>;

/// Boxed future returned by [`Tool::invoke`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'a>>;

/// Description of a tool for help surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A capability the executor can invoke by name
///
/// Tools are registered once and must not keep per-invocation state; any
/// client or handle they need is owned by the instance.
pub trait Tool: Send + Sync {
    /// Registry key
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Run the tool on fully resolved inputs
    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

pub(crate) fn required_str<'a>(inputs: &'a ToolInputs, key: &str) -> anyhow::Result<&'a str> {
    inputs
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing '{key}' parameter"))
}

pub(crate) fn optional_str<'a>(inputs: &'a ToolInputs, key: &str) -> Option<&'a str> {
    inputs.get(key).and_then(Value::as_str)
}
