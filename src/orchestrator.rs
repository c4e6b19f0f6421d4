use std::sync::Arc;

use serde_json::Value;

use crate::agent::AgentRegistry;
use crate::error::{ConductorError, Result};
use crate::handler::{HandlerRegistry, TaskExecutor};
use crate::scheduler::{Execution, SchedulerConfig, TaskScheduler};
use crate::utils::validation::InputValidator;
use crate::workflow::{WorkflowDefinition, WorkflowStore};

/// Front door of the crate: owns the workflow store, the agent registry and
/// the scheduler, and exposes the registration / execution / inspection API
/// as one object that is cheap to share behind an `Arc`.
pub struct Orchestrator {
    workflows: WorkflowStore,
    agents: Arc<AgentRegistry>,
    scheduler: TaskScheduler,
}

impl Orchestrator {
    pub fn new(handlers: HandlerRegistry) -> Self {
        let agents = Arc::new(AgentRegistry::new());
        let scheduler = TaskScheduler::new(Arc::clone(&agents), TaskExecutor::new(handlers));
        Self {
            workflows: WorkflowStore::new(),
            agents,
            scheduler,
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = self.scheduler.with_config(config);
        self
    }

    pub fn with_max_parallel(mut self, max_parallel_tasks: usize) -> Self {
        self.scheduler = self.scheduler.with_max_parallel(max_parallel_tasks);
        self
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.scheduler = self.scheduler.with_retention(retention);
        self
    }

    /// Validates and registers a workflow definition. Re-registering an id
    /// replaces the previous definition; executions already running against
    /// the old definition are unaffected.
    pub fn register_workflow(&self, definition: WorkflowDefinition) -> Result<()> {
        self.workflows.register(definition)
    }

    /// Starts an execution of a registered workflow and returns its id.
    /// `parameters` are merged under each task's own input, with the task
    /// input winning on key conflicts.
    pub async fn execute_workflow(&self, workflow_id: &str, parameters: Value) -> Result<String> {
        InputValidator::validate_identifier("workflow id", workflow_id)?;
        let workflow = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| ConductorError::WorkflowNotFound(workflow_id.to_string()))?;
        Ok(self.scheduler.start(workflow, parameters).await)
    }

    /// Point-in-time copy of an execution's record, including per-task
    /// status, retries, outputs and errors.
    pub fn execution_status(&self, execution_id: &str) -> Result<Execution> {
        self.scheduler
            .snapshot(execution_id)
            .ok_or_else(|| ConductorError::ExecutionNotFound(execution_id.to_string()))
    }

    pub fn cancel_execution(&self, execution_id: &str) -> Result<bool> {
        self.scheduler.cancel(execution_id)
    }

    pub fn register_agent<I, S>(&self, agent_id: impl Into<String>, capabilities: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let agent_id = agent_id.into();
        InputValidator::validate_identifier("agent id", &agent_id)?;
        self.agents.register(agent_id, capabilities);
        Ok(())
    }

    pub fn register_agent_with_limit<I, S>(
        &self,
        agent_id: impl Into<String>,
        capabilities: I,
        limit: usize,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let agent_id = agent_id.into();
        InputValidator::validate_identifier("agent id", &agent_id)?;
        self.agents.register_with_limit(agent_id, capabilities, limit);
        Ok(())
    }

    pub fn unregister_agent(&self, agent_id: &str) -> bool {
        self.agents.unregister(agent_id)
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn workflows(&self) -> &WorkflowStore {
        &self.workflows
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }
}
