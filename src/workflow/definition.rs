use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::agent::AgentRole;

use super::task::{TaskDependency, WorkflowTask, WorkflowTrigger};

/// A registered workflow template: tasks, their dependencies, and the agents
/// eligible to perform them. Registration under an existing id overwrites the
/// prior definition (last write wins, no versioning).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<AgentRole>,
    #[serde(default)]
    pub tasks: Vec<WorkflowTask>,
    #[serde(default)]
    pub dependencies: Vec<TaskDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<WorkflowTrigger>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            agents: Vec::new(),
            tasks: Vec::new(),
            dependencies: Vec::new(),
            triggers: Vec::new(),
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&WorkflowTask> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn role(&self, agent_id: &str) -> Option<&AgentRole> {
        self.agents.iter().find(|role| role.agent_id == agent_id)
    }

    /// Union of the capabilities declared across all roles. Used as a
    /// registration-time lint against task requirements; the live registry
    /// remains authoritative at dispatch time.
    pub fn declared_capabilities(&self) -> HashSet<&str> {
        self.agents
            .iter()
            .flat_map(|role| role.capabilities.iter().map(String::as_str))
            .collect()
    }
}
