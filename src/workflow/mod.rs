pub mod builder;
pub mod definition;
pub mod graph;
pub mod loader;
pub mod store;
pub mod task;

pub use builder::WorkflowBuilder;
pub use definition::WorkflowDefinition;
pub use graph::DependencyGraph;
pub use loader::{definition_from_path, definition_from_str, definition_from_value};
pub use store::{StoredWorkflow, WorkflowStore};
pub use task::{
    TaskDependency, WorkflowTask, WorkflowTrigger, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS,
};
