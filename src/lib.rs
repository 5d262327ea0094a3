#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod analysis;
pub mod answer;
pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
pub mod planner;
pub mod solver;
pub mod tools;

pub use config::Config;
pub use engine::{
    AbortReason, CoordinatorConfig, ExecutionCoordinator, ExecutionResult, PlanRun, PlanStatus,
    StepState,
};
pub use error::{PlanError, StepError, StepwiseError};
pub use planner::{Plan, PlanBuilder, Step, StepId, StepInput};
pub use solver::{LogEntry, SolveReport, Solver};
pub use tools::{Tool, ToolRegistry};
