pub mod agent;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod scheduler;
pub mod utils;
pub mod workflow;

pub use agent::{AgentCandidate, AgentPermit, AgentRegistry, AgentRole, AgentRoleKind};
pub use error::{ConductorError, Result, TaskFailure};
pub use handler::{
    EchoHandler, FlakyHandler, FnHandler, HandlerRegistry, TaskExecutor, TaskHandler,
    TaskInvocation,
};
pub use orchestrator::Orchestrator;
pub use scheduler::{
    Execution, ExecutionRegistry, ExecutionStatus, SchedulerConfig, TaskScheduler, TaskState,
    TaskStatus,
};
pub use utils::{logging, validation};
pub use workflow::{
    definition_from_path, definition_from_str, definition_from_value, DependencyGraph,
    StoredWorkflow, TaskDependency, WorkflowBuilder, WorkflowDefinition, WorkflowStore,
    WorkflowTask, WorkflowTrigger, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS,
};
