use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConductorError>;

#[derive(Debug, Error)]
pub enum ConductorError {
    #[error("workflow `{0}` not registered")]
    WorkflowNotFound(String),
    #[error("execution `{0}` not found")]
    ExecutionNotFound(String),
    #[error("workflow `{workflow}` has a dependency cycle (task `{task}` can never be scheduled)")]
    CyclicDependency { workflow: String, task: String },
    #[error("workflow `{workflow}` dependency references unknown task `{task}`")]
    UnknownDependency { workflow: String, task: String },
    #[error("workflow `{workflow}` declares duplicate task `{task}`")]
    DuplicateTask { workflow: String, task: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why one task attempt (or the task as a whole) failed. Recorded on the
/// task's live state and surfaced through status snapshots; never raised to
/// facade callers.
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskFailure {
    #[error("no registered agent offers capabilities {required:?}")]
    NoCapableAgent { required: Vec<String> },
    #[error("no handler registered for task kind `{kind}`")]
    HandlerNotRegistered {
        #[serde(rename = "task_kind")]
        kind: String,
    },
    #[error("handler failed: {message}")]
    Handler { message: String },
    #[error("handler exceeded timeout of {timeout_ms}ms")]
    HandlerTimeout { timeout_ms: u64 },
}

impl TaskFailure {
    /// Missing capabilities and missing handlers are configuration gaps, not
    /// transient faults; they fail the task without burning retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TaskFailure::Handler { .. } | TaskFailure::HandlerTimeout { .. }
        )
    }
}
