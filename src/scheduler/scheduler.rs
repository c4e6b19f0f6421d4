use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::agent::AgentRegistry;
use crate::error::{ConductorError, Result};
use crate::handler::TaskExecutor;
use crate::workflow::StoredWorkflow;

use super::driver;
use super::execution::{execution_id, Execution};
use super::registry::{ExecutionHandle, ExecutionRegistry};
use super::types::TaskStatus;

const DEFAULT_MAX_PARALLEL_TASKS: usize = 8;

/// Tunables for the scheduler. `max_parallel_tasks` caps concurrent attempts
/// per execution, independent of any per-agent limits.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    pub max_parallel_tasks: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: DEFAULT_MAX_PARALLEL_TASKS,
        }
    }
}

/// Starts executions and tracks them until (and after) they settle. Each
/// started execution gets its own driver task; the scheduler itself holds no
/// locks while executions run.
pub struct TaskScheduler {
    agents: Arc<AgentRegistry>,
    executor: Arc<TaskExecutor>,
    executions: Arc<ExecutionRegistry>,
    config: SchedulerConfig,
}

impl TaskScheduler {
    pub fn new(agents: Arc<AgentRegistry>, executor: TaskExecutor) -> Self {
        Self {
            agents,
            executor: Arc::new(executor),
            executions: Arc::new(ExecutionRegistry::new()),
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel_tasks: usize) -> Self {
        self.config.max_parallel_tasks = max_parallel_tasks.max(1);
        self
    }

    /// Replaces the execution registry with one retaining `retention`
    /// finished executions. Call before starting executions; anything
    /// tracked so far is dropped with the old registry.
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.executions = Arc::new(ExecutionRegistry::with_retention(retention));
        self
    }

    pub fn executions(&self) -> &ExecutionRegistry {
        &self.executions
    }

    /// Creates the execution record, marks root tasks ready, and spawns the
    /// driver. Returns the new execution id immediately; progress is
    /// observed through [`TaskScheduler::snapshot`].
    pub async fn start(&self, workflow: Arc<StoredWorkflow>, parameters: Value) -> String {
        let execution_id = execution_id();
        let mut record = Execution::new(
            execution_id.as_str(),
            workflow.definition.id.as_str(),
            parameters,
            &workflow.definition.tasks,
        );
        let initial = workflow.graph.initial_ready();
        for task_id in &initial {
            if let Some(state) = record.tasks.get_mut(task_id) {
                state.status = TaskStatus::Ready;
            }
        }

        let handle = Arc::new(ExecutionHandle::new(record));
        self.executions.insert(Arc::clone(&handle));
        info!(
            execution = %execution_id,
            workflow = %workflow.definition.id,
            tasks = workflow.definition.tasks.len(),
            "execution started"
        );

        tokio::spawn(driver::drive(
            workflow,
            handle,
            Arc::clone(&self.agents),
            Arc::clone(&self.executor),
            initial,
            self.config.max_parallel_tasks,
        ));
        execution_id
    }

    pub fn snapshot(&self, execution_id: &str) -> Option<Execution> {
        self.executions.snapshot(execution_id)
    }

    /// Cancels a tracked execution. `Ok(true)` when this call flipped it,
    /// `Ok(false)` when it had already settled.
    pub fn cancel(&self, execution_id: &str) -> Result<bool> {
        match self.executions.cancel(execution_id) {
            None => Err(ConductorError::ExecutionNotFound(execution_id.to_string())),
            Some(changed) => {
                if changed {
                    info!(execution = %execution_id, "execution cancelled");
                }
                Ok(changed)
            }
        }
    }
}
