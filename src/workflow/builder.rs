use serde_json::Value;

use crate::agent::AgentRole;

use super::definition::WorkflowDefinition;
use super::task::{TaskDependency, WorkflowTask, WorkflowTrigger};

/// Fluent assembly of a [`WorkflowDefinition`].
///
/// The builder does not validate; well-formedness and acyclicity are checked
/// when the definition is registered.
pub struct WorkflowBuilder {
    id: String,
    name: Option<String>,
    description: Option<String>,
    agents: Vec<AgentRole>,
    tasks: Vec<WorkflowTask>,
    dependencies: Vec<TaskDependency>,
    triggers: Vec<WorkflowTrigger>,
}

impl WorkflowBuilder {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            agents: Vec::new(),
            tasks: Vec::new(),
            dependencies: Vec::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_description(&mut self, description: &str) -> &mut Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn add_agent(&mut self, role: AgentRole) -> &mut Self {
        self.agents.push(role);
        self
    }

    pub fn add_task(&mut self, task: WorkflowTask) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Declares that `to` may not start until `from` completes.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> &mut Self {
        self.dependencies.push(TaskDependency::new(from, to));
        self
    }

    pub fn add_trigger(&mut self, kind: &str, config: Option<Value>) -> &mut Self {
        self.triggers.push(WorkflowTrigger {
            kind: kind.to_string(),
            config,
        });
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        let name = self.name.unwrap_or_else(|| self.id.clone());
        WorkflowDefinition {
            id: self.id,
            name,
            description: self.description.unwrap_or_default(),
            agents: self.agents,
            tasks: self.tasks,
            dependencies: self.dependencies,
            triggers: self.triggers,
        }
    }
}
