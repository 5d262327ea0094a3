use super::dag::DependencyGraph;
use crate::error::PlanError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Step identifier, unique within one plan.
pub type StepId = u32;

/// Placeholder for "the output of step N", optionally narrowed by a JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepReference {
    #[serde(rename = "$step")]
    pub step: StepId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
}

/// One named input of a step.
///
/// Serialized untagged: `{"$step": 3}` (optionally with `"pointer"`) is a
/// reference, anything else is a literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepInput {
    Reference(StepReference),
    Literal(Value),
}

impl StepInput {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(step: StepId) -> Self {
        Self::Reference(StepReference {
            step,
            pointer: None,
        })
    }

    pub fn reference_at(step: StepId, pointer: impl Into<String>) -> Self {
        Self::Reference(StepReference {
            step,
            pointer: Some(pointer.into()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    #[serde(default)]
    pub description: String,
    pub tool: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, StepInput>,
    #[serde(default)]
    pub dependencies: BTreeSet<StepId>,
}

impl Step {
    pub fn new(id: StepId, tool: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            tool: tool.into(),
            inputs: BTreeMap::new(),
            dependencies: BTreeSet::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, input: StepInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn depends_on(mut self, dependency: StepId) -> Self {
        self.dependencies.insert(dependency);
        self
    }

    /// Steps whose outputs this step's inputs point at.
    pub fn referenced_steps(&self) -> BTreeSet<StepId> {
        self.inputs
            .values()
            .filter_map(|input| match input {
                StepInput::Reference(reference) => Some(reference.step),
                StepInput::Literal(_) => None,
            })
            .collect()
    }
}

/// A DAG of steps keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Parse `{"steps": [...]}` or a bare step array. Does not validate.
    pub fn from_json(raw: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Wrapped(Plan),
            Bare(Vec<Step>),
        }

        let wire: Wire = serde_json::from_str(raw).context("Failed to parse plan JSON")?;
        Ok(match wire {
            Wire::Wrapped(plan) => plan,
            Wire::Bare(steps) => Self::new(steps),
        })
    }

    /// Reject duplicate ids, dangling dependencies and cycles, in that order.
    pub fn validate(&self) -> Result<(), PlanError> {
        DependencyGraph::build(&self.steps)?.validate()
    }

    /// Waves of step ids; every step's dependencies lie in strictly earlier waves.
    pub fn topological_layers(&self) -> Result<Vec<BTreeSet<StepId>>, PlanError> {
        DependencyGraph::build(&self.steps)?.layers()
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps.iter().map(|step| step.id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every step that directly or transitively depends on `root`.
    pub fn transitive_dependents(&self, root: StepId) -> BTreeSet<StepId> {
        let mut downstream: BTreeMap<StepId, BTreeSet<StepId>> = BTreeMap::new();
        if let Ok(graph) = DependencyGraph::build(&self.steps) {
            downstream.clone_from(graph.dependents());
        } else {
            for step in &self.steps {
                for dependency in &step.dependencies {
                    downstream.entry(*dependency).or_default().insert(step.id);
                }
            }
        }

        let mut reached = BTreeSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            if let Some(children) = downstream.get(&current) {
                for child in children {
                    if *child != root && reached.insert(*child) {
                        queue.push_back(*child);
                    }
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(id: StepId, deps: &[StepId]) -> Step {
        let mut step = Step::new(id, "calculator", format!("step {id}"));
        step.dependencies = deps.iter().copied().collect();
        step
    }

    #[test]
    fn validate_accepts_chain() {
        let plan = Plan::new(vec![step(1, &[]), step(2, &[1]), step(3, &[2])]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn validate_rejects_mutual_dependency_as_cycle() {
        let plan = Plan::new(vec![step(1, &[2]), step(2, &[1])]);
        assert!(matches!(plan.validate(), Err(PlanError::Cycle { .. })));
    }

    #[test]
    fn validate_rejects_dependency_outside_plan() {
        let plan = Plan::new(vec![step(1, &[]), step(2, &[42])]);
        assert_eq!(
            plan.validate().unwrap_err(),
            PlanError::MissingDependency {
                step: 2,
                dependency: 42
            }
        );
    }

    #[test]
    fn validate_reports_duplicates_before_cycles() {
        let plan = Plan::new(vec![step(1, &[1]), step(1, &[])]);
        assert_eq!(plan.validate().unwrap_err(), PlanError::DuplicateStepId(1));
    }

    #[test]
    fn layers_respect_dependencies() {
        let plan = Plan::new(vec![
            step(5, &[3, 4]),
            step(4, &[1]),
            step(3, &[1, 2]),
            step(2, &[]),
            step(1, &[]),
        ]);
        let layers = plan.topological_layers().unwrap();

        let mut layer_of = BTreeMap::new();
        for (index, layer) in layers.iter().enumerate() {
            for id in layer {
                layer_of.insert(*id, index);
            }
        }
        assert_eq!(layer_of.len(), plan.len());
        for step in &plan.steps {
            for dependency in &step.dependencies {
                assert!(layer_of[dependency] < layer_of[&step.id]);
            }
        }
        assert_eq!(layers[0], BTreeSet::from([1, 2]));
    }

    #[test]
    fn transitive_dependents_follow_chains() {
        let plan = Plan::new(vec![
            step(1, &[]),
            step(2, &[1]),
            step(3, &[2]),
            step(4, &[]),
        ]);
        assert_eq!(plan.transitive_dependents(1), BTreeSet::from([2, 3]));
        assert!(plan.transitive_dependents(4).is_empty());
    }

    #[test]
    fn referenced_steps_lists_reference_inputs_only() {
        let step = Step::new(3, "code_executor", "run script")
            .with_input("code", StepInput::reference(1))
            .with_input("language", StepInput::literal("python"))
            .with_input("limit", StepInput::reference_at(2, "/rows/0"));
        assert_eq!(step.referenced_steps(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn step_input_reference_wire_format() {
        let value = serde_json::to_value(StepInput::reference_at(3, "/value")).unwrap();
        assert_eq!(value, json!({"$step": 3, "pointer": "/value"}));

        let parsed: StepInput = serde_json::from_value(json!({"$step": 7})).unwrap();
        assert_eq!(parsed, StepInput::reference(7));
    }

    #[test]
    fn step_input_object_with_extra_keys_is_literal() {
        let parsed: StepInput = serde_json::from_value(json!({"$step": 7, "other": 1})).unwrap();
        assert!(matches!(parsed, StepInput::Literal(_)));
    }

    #[test]
    fn plan_from_json_accepts_wrapped_and_bare_forms() {
        let wrapped = r#"{"steps": [{"id": 1, "tool": "calculator", "inputs": {"expression": "6*7"}}]}"#;
        let bare = r#"[{"id": 1, "tool": "calculator", "dependencies": []},
                      {"id": 2, "tool": "calculator", "dependencies": [1],
                       "inputs": {"expression": {"$step": 1}}}]"#;

        let plan = Plan::from_json(wrapped).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan.steps[0].inputs["expression"],
            StepInput::literal("6*7")
        );

        let plan = Plan::from_json(bare).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[1].inputs["expression"], StepInput::reference(1));
    }

    #[test]
    fn plan_from_json_rejects_garbage() {
        assert!(Plan::from_json("not json").is_err());
    }
}
