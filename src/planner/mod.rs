mod builder;
mod dag;
mod types;

pub use builder::PlanBuilder;
pub use types::{Plan, Step, StepId, StepInput, StepReference};

pub(crate) use dag::find_cycle;
