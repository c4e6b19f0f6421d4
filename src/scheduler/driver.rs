use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::agent::AgentRegistry;
use crate::error::TaskFailure;
use crate::handler::TaskExecutor;
use crate::workflow::StoredWorkflow;

use super::execution::Execution;
use super::registry::ExecutionHandle;
use super::types::{ExecutionStatus, TaskStatus};

/// How long to wait before re-trying dispatch when every capable agent is
/// saturated and no attempt is about to finish in this execution.
const DISPATCH_RETRY_INTERVAL: Duration = Duration::from_millis(25);

struct AttemptOutcome {
    task_id: String,
    attempt: u32,
    agent_id: String,
    result: std::result::Result<Value, TaskFailure>,
}

enum Applied {
    Completed,
    Requeued,
    Failed,
    LateResult,
}

/// Drives one execution to a terminal state: dispatches dispatchable tasks
/// to capable agents, applies attempt outcomes, and unlocks dependents.
///
/// The record lock is only ever taken between awaits, never across one. Each
/// queued task has at most one attempt in flight because dispatch moves it to
/// `Running` and outcomes are applied before the next dispatch pass.
pub(crate) async fn drive(
    workflow: Arc<StoredWorkflow>,
    handle: Arc<ExecutionHandle>,
    agents: Arc<AgentRegistry>,
    executor: Arc<TaskExecutor>,
    mut queue: Vec<String>,
    max_parallel: usize,
) {
    let mut attempts: JoinSet<AttemptOutcome> = JoinSet::new();
    loop {
        dispatch(
            &workflow, &handle, &agents, &executor, &mut queue, &mut attempts, max_parallel,
        );
        if attempts.is_empty() && queue.is_empty() {
            break;
        }
        tokio::select! {
            Some(joined) = attempts.join_next(), if !attempts.is_empty() => {
                match joined {
                    Ok(outcome) => {
                        let mut guard = handle.record.write();
                        apply_outcome(&workflow, &mut guard, outcome, &mut queue);
                    }
                    Err(join_error) => {
                        warn!(execution = %handle.execution_id, error = %join_error, "task attempt aborted");
                    }
                }
            }
            _ = handle.notify.notified() => {}
            _ = sleep(DISPATCH_RETRY_INTERVAL), if !queue.is_empty() => {}
        }
    }
    finalize(&handle);
}

/// Walks the queue in order and spawns an attempt for every dispatchable
/// task that finds a free capable agent. Saturated tasks stay queued; tasks
/// with no capable agent at all fail the execution.
fn dispatch(
    workflow: &StoredWorkflow,
    handle: &ExecutionHandle,
    agents: &AgentRegistry,
    executor: &Arc<TaskExecutor>,
    queue: &mut Vec<String>,
    attempts: &mut JoinSet<AttemptOutcome>,
    max_parallel: usize,
) {
    let mut guard = handle.record.write();
    let record = &mut *guard;
    queue.retain(|task_id| {
        if record.status.is_terminal() {
            return false;
        }
        if attempts.len() >= max_parallel {
            return true;
        }
        let required = {
            let Some(state) = record.tasks.get_mut(task_id) else {
                return false;
            };
            if !state.status.is_dispatchable() {
                return false;
            }
            state.task.required_capabilities.clone()
        };

        let candidates = agents.find_capable(&workflow.definition.agents, &required);
        if candidates.is_empty() {
            let required: Vec<String> = required.into_iter().collect();
            warn!(
                execution = %record.execution_id,
                task = %task_id,
                ?required,
                "no capable agent registered for task"
            );
            fail_task(record, task_id, TaskFailure::NoCapableAgent { required });
            return false;
        }

        let mut assignment = None;
        for candidate in &candidates {
            if let Some(permit) = candidate.try_assign() {
                assignment = Some((candidate.agent_id().to_string(), permit));
                break;
            }
        }
        let Some((agent_id, permit)) = assignment else {
            debug!(
                execution = %record.execution_id,
                task = %task_id,
                "all capable agents saturated, deferring dispatch"
            );
            return true;
        };

        let Some(state) = record.tasks.get_mut(task_id) else {
            return false;
        };
        state.status = TaskStatus::Running;
        state.assigned_agent = Some(agent_id.clone());
        if state.started_at.is_none() {
            state.started_at = Some(SystemTime::now());
        }
        let attempt = state.retry_count;
        let task = state.task.clone();
        debug!(
            execution = %record.execution_id,
            task = %task_id,
            agent = %agent_id,
            attempt,
            "dispatching task"
        );

        let executor = Arc::clone(executor);
        let execution_id = record.execution_id.clone();
        let parameters = record.parameters.clone();
        let task_id = task_id.clone();
        attempts.spawn(async move {
            let result = executor
                .invoke(&execution_id, &agent_id, &task, &parameters)
                .await;
            drop(permit);
            AttemptOutcome {
                task_id,
                attempt,
                agent_id,
                result,
            }
        });
        false
    });
}

/// Applies one attempt outcome to the record, then propagates: completions
/// unlock dependents, retryable failures requeue, exhausted ones fail the
/// whole execution. Outcomes from superseded attempts only record data.
fn apply_outcome(
    workflow: &StoredWorkflow,
    record: &mut Execution,
    outcome: AttemptOutcome,
    queue: &mut Vec<String>,
) {
    let AttemptOutcome {
        task_id,
        attempt,
        agent_id,
        result,
    } = outcome;
    let now = SystemTime::now();

    let applied = {
        let Some(state) = record.tasks.get_mut(&task_id) else {
            return;
        };
        if state.status != TaskStatus::Running || state.retry_count != attempt {
            // Arrived after cancellation flipped the task; keep the data,
            // leave the status alone.
            match result {
                Ok(output) => state.output = Some(output),
                Err(failure) => state.error = Some(failure),
            }
            Applied::LateResult
        } else {
            match result {
                Ok(output) => {
                    state.status = TaskStatus::Completed;
                    state.output = Some(output);
                    state.error = None;
                    state.finished_at = Some(now);
                    Applied::Completed
                }
                Err(failure) => {
                    let execution_running = record.status == ExecutionStatus::Running;
                    let retryable = failure.is_retryable();
                    if execution_running && retryable && state.retry_count < state.task.max_retries
                    {
                        state.retry_count += 1;
                        state.status = if matches!(failure, TaskFailure::HandlerTimeout { .. }) {
                            TaskStatus::TimedOut
                        } else {
                            TaskStatus::Ready
                        };
                        warn!(
                            execution = %record.execution_id,
                            task = %task_id,
                            agent = %agent_id,
                            attempt = attempt + 1,
                            max_retries = state.task.max_retries,
                            error = %failure,
                            "task attempt failed, retrying"
                        );
                        state.error = Some(failure);
                        Applied::Requeued
                    } else if !execution_running && retryable {
                        // Would have retried, but the execution is already
                        // over; close the task out instead.
                        state.status = TaskStatus::Cancelled;
                        state.error = Some(failure);
                        state.finished_at = Some(now);
                        Applied::LateResult
                    } else {
                        state.status = TaskStatus::Failed;
                        state.error = Some(failure);
                        state.finished_at = Some(now);
                        Applied::Failed
                    }
                }
            }
        }
    };

    match applied {
        Applied::Completed => {
            debug!(execution = %record.execution_id, task = %task_id, agent = %agent_id, "task completed");
            if record.status == ExecutionStatus::Running {
                let newly = workflow.graph.newly_ready(&task_id, |id| {
                    record
                        .tasks
                        .get(id)
                        .map(|state| state.status == TaskStatus::Completed)
                        .unwrap_or(false)
                });
                for ready_id in newly {
                    if let Some(state) = record.tasks.get_mut(&ready_id) {
                        if state.status == TaskStatus::Pending {
                            state.status = TaskStatus::Ready;
                            queue.push(ready_id);
                        }
                    }
                }
                if record
                    .tasks
                    .values()
                    .all(|state| state.status == TaskStatus::Completed)
                {
                    record.status = ExecutionStatus::Completed;
                    record.finished_at = Some(now);
                    info!(execution = %record.execution_id, "execution completed");
                }
            }
        }
        Applied::Requeued => queue.push(task_id),
        Applied::Failed => {
            warn!(
                execution = %record.execution_id,
                task = %task_id,
                agent = %agent_id,
                "task failed permanently"
            );
            fail_execution(record, now);
            queue.clear();
        }
        Applied::LateResult => {}
    }
}

fn fail_task(record: &mut Execution, task_id: &str, failure: TaskFailure) {
    let now = SystemTime::now();
    if let Some(state) = record.tasks.get_mut(task_id) {
        state.status = TaskStatus::Failed;
        state.error = Some(failure);
        state.finished_at = Some(now);
    }
    fail_execution(record, now);
}

/// Marks the execution failed and cancels every task that has not been
/// dispatched yet. Running tasks are left alone so their attempts can land
/// a real final status.
fn fail_execution(record: &mut Execution, now: SystemTime) {
    if record.status != ExecutionStatus::Running {
        return;
    }
    record.status = ExecutionStatus::Failed;
    record.finished_at = Some(now);
    for state in record.tasks.values_mut() {
        if matches!(
            state.status,
            TaskStatus::Pending | TaskStatus::Ready | TaskStatus::TimedOut
        ) {
            state.status = TaskStatus::Cancelled;
            state.finished_at = Some(now);
        }
    }
    info!(execution = %record.execution_id, "execution failed");
}

/// Settles the record when the drive loop exits while the execution still
/// reads `Running`. A workflow with no tasks completes vacuously here.
fn finalize(handle: &ExecutionHandle) {
    let mut guard = handle.record.write();
    let record = &mut *guard;
    if record.status != ExecutionStatus::Running {
        return;
    }
    let now = SystemTime::now();
    let all_completed = record
        .tasks
        .values()
        .all(|state| state.status == TaskStatus::Completed);
    for state in record.tasks.values_mut() {
        if !state.status.is_terminal() {
            state.status = TaskStatus::Cancelled;
            state.finished_at = Some(now);
        }
    }
    record.status = if all_completed {
        ExecutionStatus::Completed
    } else {
        ExecutionStatus::Failed
    };
    record.finished_at = Some(now);
    info!(execution = %record.execution_id, status = %record.status, "execution finished");
}
