use super::context::ExecutionContext;
use super::result::ExecutionResult;
use crate::error::StepError;
use crate::planner::{Step, StepId};
use crate::tools::{Tool, ToolInputs, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A step whose inputs and tool have been resolved and is ready to invoke.
///
/// Owns everything it needs, so it can move into a spawned task.
#[derive(Clone)]
pub struct PreparedStep {
    pub step_id: StepId,
    pub tool_name: String,
    tool: Arc<dyn Tool>,
    inputs: ToolInputs,
}

impl PreparedStep {
    pub fn inputs(&self) -> &ToolInputs {
        &self.inputs
    }

    /// One bounded invocation. Tool errors and timeouts come back as
    /// [`StepError`] values.
    pub async fn invoke(&self, timeout: Duration) -> Result<Value, StepError> {
        match tokio::time::timeout(timeout, self.tool.invoke(&self.inputs)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(error)) => Err(StepError::Tool(format!("{error:#}"))),
            Err(_) => Err(StepError::Timeout {
                after_ms: duration_ms(timeout),
            }),
        }
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs single steps against the shared tool registry.
#[derive(Clone)]
pub struct StepExecutor {
    registry: Arc<ToolRegistry>,
}

impl StepExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolve inputs against `context`, then the tool. Either failure is
    /// permanent and means the tool is never invoked.
    pub fn prepare(
        &self,
        step: &Step,
        context: &ExecutionContext,
    ) -> Result<PreparedStep, StepError> {
        let inputs = context.resolve_inputs(step)?;
        let tool = self.registry.resolve(&step.tool)?;
        Ok(PreparedStep {
            step_id: step.id,
            tool_name: step.tool.clone(),
            tool,
            inputs,
        })
    }

    /// Prepare and invoke once. Always yields a result.
    pub async fn run(
        &self,
        step: &Step,
        context: &ExecutionContext,
        timeout: Duration,
    ) -> ExecutionResult {
        let started = Instant::now();
        let outcome = match self.prepare(step, context) {
            Ok(prepared) => prepared.invoke(timeout).await,
            Err(error) => Err(error),
        };
        let result = match outcome {
            Ok(output) => ExecutionResult::succeeded(step.id, &step.tool, output),
            Err(error) => ExecutionResult::failed(step.id, &step.tool, error),
        };
        result.with_duration_ms(duration_ms(started.elapsed()))
    }
}
