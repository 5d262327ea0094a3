//! Plan execution: dependency-ordered batches, bounded retries, and a
//! write-once context carrying outputs from earlier steps to later ones.

mod context;
mod coordinator;
mod executor;
mod result;
mod scheduler;

pub use context::ExecutionContext;
pub use coordinator::{CoordinatorConfig, ExecutionCoordinator};
pub use executor::{PreparedStep, StepExecutor};
pub use result::{AbortReason, ExecutionResult, PlanRun, PlanStatus, StepState};
pub use scheduler::StepScheduler;
