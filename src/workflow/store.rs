use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::Result;
use crate::utils::validation::InputValidator;

use super::definition::WorkflowDefinition;
use super::graph::DependencyGraph;

/// A registered definition bundled with its prebuilt dependency graph.
#[derive(Clone)]
pub struct StoredWorkflow {
    pub definition: Arc<WorkflowDefinition>,
    pub graph: Arc<DependencyGraph>,
}

/// Registered workflow definitions keyed by id.
#[derive(Default)]
pub struct WorkflowStore {
    workflows: RwLock<HashMap<String, Arc<StoredWorkflow>>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Validates and stores a definition, overwriting any prior definition
    /// with the same id. All validation runs before the insert, so a
    /// rejected definition leaves the store untouched.
    pub fn register(&self, definition: WorkflowDefinition) -> Result<()> {
        InputValidator::validate_identifier("workflow id", &definition.id)?;
        for task in &definition.tasks {
            InputValidator::validate_identifier("task id", &task.id)?;
            InputValidator::validate_required("task kind", &task.kind)?;
        }
        for role in &definition.agents {
            InputValidator::validate_identifier("agent id", &role.agent_id)?;
        }

        let graph = DependencyGraph::build(&definition)?;
        Self::lint_capabilities(&definition);

        info!(
            workflow = %definition.id,
            tasks = definition.tasks.len(),
            agents = definition.agents.len(),
            "workflow registered"
        );
        let stored = Arc::new(StoredWorkflow {
            definition: Arc::new(definition),
            graph: Arc::new(graph),
        });
        self.workflows
            .write()
            .insert(stored.definition.id.clone(), stored);
        Ok(())
    }

    pub fn get(&self, workflow_id: &str) -> Option<Arc<StoredWorkflow>> {
        self.workflows.read().get(workflow_id).map(Arc::clone)
    }

    pub fn contains(&self, workflow_id: &str) -> bool {
        self.workflows.read().contains_key(workflow_id)
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }

    /// Authoring aid: requirements not covered by any declared role are
    /// usually typos. Not an error, because the live agent registry decides
    /// at dispatch time.
    fn lint_capabilities(definition: &WorkflowDefinition) {
        let declared = definition.declared_capabilities();
        for task in &definition.tasks {
            let missing: Vec<&str> = task
                .required_capabilities
                .iter()
                .map(String::as_str)
                .filter(|capability| !declared.contains(capability))
                .collect();
            if !missing.is_empty() {
                warn!(
                    workflow = %definition.id,
                    task = %task.id,
                    ?missing,
                    "task requires capabilities no declared role provides"
                );
            }
        }
    }
}
