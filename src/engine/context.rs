use crate::error::StepError;
use crate::planner::{Step, StepId, StepInput, StepReference};
use crate::tools::ToolInputs;
use serde_json::Value;
use std::collections::BTreeMap;

/// Outputs of completed steps within one plan run.
///
/// Written once per step by the coordinator after the step's batch has
/// finished; read when resolving the inputs of later steps.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    outputs: BTreeMap<StepId, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step_id: StepId) -> Option<&Value> {
        self.outputs.get(&step_id)
    }

    pub fn contains(&self, step_id: StepId) -> bool {
        self.outputs.contains_key(&step_id)
    }

    /// Record a step's output. Returns `false` (keeping the first value)
    /// if the step already has one.
    pub fn insert(&mut self, step_id: StepId, output: Value) -> bool {
        if self.outputs.contains_key(&step_id) {
            tracing::warn!(step = step_id, "context.rewrite_rejected");
            return false;
        }
        self.outputs.insert(step_id, output);
        true
    }

    /// The referenced output, narrowed by the reference's JSON Pointer.
    pub fn resolve(&self, reference: &StepReference) -> Option<&Value> {
        let output = self.outputs.get(&reference.step)?;
        match reference.pointer.as_deref() {
            None | Some("") => Some(output),
            Some(pointer) => output.pointer(pointer),
        }
    }

    /// Substitute every reference in `step.inputs`; literals pass through.
    pub fn resolve_inputs(&self, step: &Step) -> Result<ToolInputs, StepError> {
        let mut resolved = ToolInputs::new();
        for (name, input) in &step.inputs {
            let value = match input {
                StepInput::Literal(value) => value.clone(),
                StepInput::Reference(reference) => self
                    .resolve(reference)
                    .cloned()
                    .ok_or_else(|| StepError::UnresolvedInput {
                        parameter: name.clone(),
                        step: reference.step,
                    })?,
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
