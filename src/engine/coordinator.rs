use super::context::ExecutionContext;
use super::executor::{PreparedStep, StepExecutor, duration_ms};
use super::result::{AbortReason, ExecutionResult, PlanRun, PlanStatus, StepState};
use super::scheduler::StepScheduler;
use crate::error::{PlanError, StepError};
use crate::observability::{NoopObserver, Observer, RunEvent};
use crate::planner::{Plan, StepId};
use crate::tools::ToolRegistry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Limits and policies for one coordinator, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Attempted steps per run (retries do not count).
    pub max_steps: usize,
    pub per_step_timeout: Duration,
    pub plan_timeout: Duration,
    /// Extra attempts on `Timeout` / `Tool` errors.
    pub retry_attempts: u32,
    /// Sleep before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
    /// Let failed and skipped dependencies satisfy dependency edges.
    pub continue_on_failure: bool,
    /// Parallel steps per batch; 0 means unbounded.
    pub max_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 20,
            per_step_timeout: Duration::from_secs(30),
            plan_timeout: Duration::from_secs(300),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            continue_on_failure: false,
            max_concurrency: 0,
        }
    }
}

/// Retry policy handed to each spawned step.
#[derive(Debug, Clone, Copy)]
struct AttemptPolicy {
    timeout: Duration,
    retry_attempts: u32,
    backoff: Duration,
}

/// Drives a plan to completion: asks the scheduler for ready batches, runs
/// each batch concurrently, records results and owns the execution context.
pub struct ExecutionCoordinator {
    executor: StepExecutor,
    config: CoordinatorConfig,
    observer: Arc<dyn Observer>,
}

impl ExecutionCoordinator {
    pub fn new(registry: Arc<ToolRegistry>, config: CoordinatorConfig) -> Self {
        Self {
            executor: StepExecutor::new(registry),
            config,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Execute `plan`. Never fails: structural problems, budget exhaustion
    /// and timeouts are reported through [`PlanRun::status`] and
    /// [`PlanRun::abort`].
    pub async fn execute(&self, plan: &Plan) -> PlanRun {
        let run = RunState::start(plan, Arc::clone(&self.observer));
        tracing::info!(run_id = %run.run_id, steps = plan.len(), "coordinator.start");

        if let Err(error) = plan.validate() {
            tracing::warn!(run_id = %run.run_id, error = %error, "coordinator.invalid_plan");
            return run.finish(Some(AbortReason::Invalid { error }));
        }

        let deadline = tokio::time::Instant::now() + self.config.plan_timeout;
        let scheduler = StepScheduler::new(plan, self.config.continue_on_failure);
        let mut run = run;
        run.states = scheduler.initial_states();

        let abort = loop {
            if StepScheduler::is_finished(&run.states) {
                break None;
            }
            if run.steps_run >= self.config.max_steps {
                break Some(AbortReason::StepBudget {
                    max_steps: self.config.max_steps,
                });
            }
            if tokio::time::Instant::now() >= deadline {
                break Some(self.timeout_reason());
            }

            let ready = match scheduler.next_ready_batch(&run.states) {
                Ok(ready) => ready,
                Err(error) => break Some(AbortReason::Invalid { error }),
            };
            if ready.is_empty() {
                break Some(AbortReason::Invalid {
                    error: PlanError::Unschedulable {
                        pending: StepScheduler::unfinished(&run.states),
                    },
                });
            }

            let budget = self.config.max_steps - run.steps_run;
            let batch = ready.into_iter().take(budget).collect::<Vec<_>>();
            let timed_out = self.run_batch(plan, &batch, &mut run, deadline).await;
            if timed_out {
                break Some(self.timeout_reason());
            }
        };

        if let Some(reason) = &abort {
            tracing::warn!(run_id = %run.run_id, reason = %reason, "coordinator.aborted");
        }
        run.finish(abort)
    }

    fn timeout_reason(&self) -> AbortReason {
        AbortReason::PlanTimeout {
            after_ms: duration_ms(self.config.plan_timeout),
        }
    }

    /// Run one batch to completion (or until `deadline`), then fold its
    /// results into `run` in ascending step id. Returns whether the plan
    /// deadline cut the batch short.
    async fn run_batch(
        &self,
        plan: &Plan,
        batch: &[StepId],
        run: &mut RunState,
        deadline: tokio::time::Instant,
    ) -> bool {
        run.observer.record_event(&RunEvent::BatchStarted {
            run_id: run.run_id.clone(),
            index: run.batches,
            steps: batch.to_vec(),
        });
        run.batches += 1;

        let policy = AttemptPolicy {
            timeout: self.config.per_step_timeout,
            retry_attempts: self.config.retry_attempts,
            backoff: self.config.retry_backoff,
        };
        let semaphore = (self.config.max_concurrency > 0)
            .then(|| Arc::new(Semaphore::new(self.config.max_concurrency)));

        let mut finished: BTreeMap<StepId, ExecutionResult> = BTreeMap::new();
        let mut in_flight = JoinSet::new();

        for id in batch {
            let Some(step) = plan.step(*id) else {
                continue;
            };
            run.set_state(*id, StepState::Ready);
            match self.executor.prepare(step, &run.context) {
                Ok(prepared) => {
                    run.set_state(*id, StepState::Running);
                    in_flight.spawn(attempt_with_retries(
                        prepared,
                        policy,
                        semaphore.clone(),
                        Arc::clone(&run.observer),
                    ));
                }
                Err(error) => {
                    tracing::debug!(step = id, error = %error, "coordinator.prepare_failed");
                    run.observer.record_event(&RunEvent::StepFinished {
                        step_id: *id,
                        tool: step.tool.clone(),
                        success: false,
                        attempts: 1,
                        duration: Duration::ZERO,
                    });
                    finished.insert(*id, ExecutionResult::failed(*id, &step.tool, error));
                }
            }
        }

        let mut timed_out = false;
        let mut panicked = false;
        loop {
            match tokio::time::timeout_at(deadline, in_flight.join_next()).await {
                Ok(Some(Ok(result))) => {
                    finished.insert(result.step_id, result);
                }
                Ok(Some(Err(error))) => {
                    tracing::warn!(error = %error, "coordinator.step_task_failed");
                    panicked = true;
                }
                Ok(None) => break,
                Err(_) => {
                    in_flight.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        for id in batch {
            if finished.contains_key(id) {
                continue;
            }
            let Some(step) = plan.step(*id) else {
                continue;
            };
            let error = if timed_out {
                StepError::Cancelled
            } else if panicked {
                StepError::Tool("step task panicked".into())
            } else {
                continue;
            };
            run.observer.record_event(&RunEvent::StepFinished {
                step_id: *id,
                tool: step.tool.clone(),
                success: false,
                attempts: 1,
                duration: Duration::ZERO,
            });
            finished.insert(*id, ExecutionResult::failed(*id, &step.tool, error));
        }

        for (id, result) in finished {
            run.steps_run += 1;
            if result.success {
                if let Some(output) = &result.output {
                    run.context.insert(id, output.clone());
                }
                run.set_state(id, StepState::Succeeded);
            } else {
                run.set_state(id, StepState::Failed);
                if !self.config.continue_on_failure {
                    run.skip_dependents(plan, id);
                }
            }
            run.results.push(result);
        }

        timed_out
    }
}

/// Invoke a prepared step, retrying transient failures.
async fn attempt_with_retries(
    prepared: PreparedStep,
    policy: AttemptPolicy,
    semaphore: Option<Arc<Semaphore>>,
    observer: Arc<dyn Observer>,
) -> ExecutionResult {
    let _permit = match semaphore {
        Some(semaphore) => semaphore.acquire_owned().await.ok(),
        None => None,
    };

    observer.record_event(&RunEvent::StepStarted {
        step_id: prepared.step_id,
        tool: prepared.tool_name.clone(),
    });
    let started = Instant::now();
    let mut attempts = 0_u32;

    let outcome = loop {
        attempts += 1;
        match prepared.invoke(policy.timeout).await {
            Ok(output) => break Ok(output),
            Err(error) if error.is_retryable() && attempts <= policy.retry_attempts => {
                tracing::warn!(
                    step = prepared.step_id,
                    attempt = attempts,
                    error = %error,
                    "step.retrying"
                );
                observer.record_event(&RunEvent::StepRetry {
                    step_id: prepared.step_id,
                    attempt: attempts + 1,
                    error: error.to_string(),
                });
                tokio::time::sleep(policy.backoff * attempts).await;
            }
            Err(error) => break Err(error),
        }
    };

    let elapsed = started.elapsed();
    let result = match outcome {
        Ok(output) => ExecutionResult::succeeded(prepared.step_id, &prepared.tool_name, output),
        Err(error) => ExecutionResult::failed(prepared.step_id, &prepared.tool_name, error),
    };
    observer.record_event(&RunEvent::StepFinished {
        step_id: prepared.step_id,
        tool: prepared.tool_name.clone(),
        success: result.success,
        attempts,
        duration: elapsed,
    });
    result
        .with_attempts(attempts)
        .with_duration_ms(duration_ms(elapsed))
}

/// Mutable state of a single run, owned by the coordinator while it executes.
struct RunState {
    run_id: String,
    started: Instant,
    observer: Arc<dyn Observer>,
    states: BTreeMap<StepId, StepState>,
    context: ExecutionContext,
    results: Vec<ExecutionResult>,
    steps_run: usize,
    batches: usize,
}

impl RunState {
    fn start(plan: &Plan, observer: Arc<dyn Observer>) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        observer.record_event(&RunEvent::PlanStarted {
            run_id: run_id.clone(),
            steps: plan.len(),
        });
        Self {
            run_id,
            started: Instant::now(),
            observer,
            states: plan.step_ids().map(|id| (id, StepState::Pending)).collect(),
            context: ExecutionContext::new(),
            results: Vec::new(),
            steps_run: 0,
            batches: 0,
        }
    }

    fn set_state(&mut self, id: StepId, state: StepState) {
        self.states.insert(id, state);
    }

    fn skip(&mut self, id: StepId, reason: String) {
        if self.states.get(&id).is_some_and(|state| state.is_terminal()) {
            return;
        }
        self.states.insert(id, StepState::Skipped);
        self.observer
            .record_event(&RunEvent::StepSkipped { step_id: id, reason });
    }

    fn skip_dependents(&mut self, plan: &Plan, failed: StepId) {
        let downstream = plan.transitive_dependents(failed);
        for id in downstream {
            self.skip(id, format!("dependency {failed} failed"));
        }
    }

    fn finish(mut self, abort: Option<AbortReason>) -> PlanRun {
        if let Some(reason) = &abort {
            let remaining = self
                .states
                .iter()
                .filter_map(|(id, state)| (!state.is_terminal()).then_some(*id))
                .collect::<BTreeSet<_>>();
            for id in remaining {
                self.skip(id, format!("run aborted: {reason}"));
            }
        }

        let status = if abort.is_some() {
            PlanStatus::Aborted
        } else if self
            .states
            .values()
            .all(|state| *state == StepState::Succeeded)
        {
            PlanStatus::Completed
        } else {
            PlanStatus::PartiallyCompleted
        };

        let elapsed = self.started.elapsed();
        self.observer.record_event(&RunEvent::PlanFinished {
            run_id: self.run_id.clone(),
            status,
            steps_run: self.steps_run,
            duration: elapsed,
        });
        tracing::info!(
            run_id = %self.run_id,
            status = %status,
            steps_run = self.steps_run,
            "coordinator.finish"
        );

        PlanRun {
            run_id: self.run_id,
            status,
            results: self.results,
            states: self.states,
            steps_run: self.steps_run,
            elapsed_ms: duration_ms(elapsed),
            abort,
        }
    }
}
