#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use stepwise::tools::{Tool, ToolFuture, ToolInputs, ToolRegistry};
use stepwise::{CoordinatorConfig, ExecutionCoordinator};

/// Returns its `value` input (or `null`) and counts invocations.
pub struct EchoTool {
    pub calls: Arc<AtomicUsize>,
}

impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "returns its value input"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"value": {}}})
    }

    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.get("value").cloned().unwrap_or(Value::Null))
        })
    }
}

/// Always fails with a tool error.
pub struct BrokenTool {
    pub calls: Arc<AtomicUsize>,
}

impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "always fails"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object"})
    }

    fn invoke<'a>(&'a self, _inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            anyhow::bail!("backend unavailable (call {call})")
        })
    }
}

/// Sleeps for `ms` milliseconds, then returns `ms`.
pub struct SleepTool;

impl Tool for SleepTool {
    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "sleeps then returns the duration"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {"ms": {"type": "integer"}}})
    }

    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            let ms = inputs.get("ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!(ms))
        })
    }
}

pub struct Harness {
    pub echo_calls: Arc<AtomicUsize>,
    pub broken_calls: Arc<AtomicUsize>,
    pub registry: Arc<ToolRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        let echo_calls = Arc::new(AtomicUsize::new(0));
        let broken_calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool {
            calls: Arc::clone(&echo_calls),
        }));
        registry.register(Box::new(BrokenTool {
            calls: Arc::clone(&broken_calls),
        }));
        registry.register(Box::new(SleepTool));
        Self {
            echo_calls,
            broken_calls,
            registry: Arc::new(registry),
        }
    }

    pub fn coordinator(&self, config: CoordinatorConfig) -> ExecutionCoordinator {
        ExecutionCoordinator::new(Arc::clone(&self.registry), config)
    }

    pub fn echo_calls(&self) -> usize {
        self.echo_calls.load(Ordering::SeqCst)
    }

    pub fn broken_calls(&self) -> usize {
        self.broken_calls.load(Ordering::SeqCst)
    }
}

pub fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        per_step_timeout: Duration::from_secs(5),
        retry_backoff: Duration::ZERO,
        ..CoordinatorConfig::default()
    }
}
