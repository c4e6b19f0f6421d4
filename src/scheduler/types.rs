use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single task inside an execution.
///
/// `TimedOut` is not terminal: a timed-out attempt with retry budget left is
/// redispatched just like `Ready`. Terminal states never transition again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// States the dispatcher may pick up and hand to an agent.
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, TaskStatus::Ready | TaskStatus::TimedOut)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match (*self, next) {
            (TaskStatus::Pending, TaskStatus::Ready | TaskStatus::Cancelled) => true,
            (TaskStatus::Ready, TaskStatus::Running | TaskStatus::Failed | TaskStatus::Cancelled) => true,
            (
                TaskStatus::Running,
                TaskStatus::Completed
                | TaskStatus::Ready
                | TaskStatus::TimedOut
                | TaskStatus::Failed
                | TaskStatus::Cancelled,
            ) => true,
            (TaskStatus::TimedOut, TaskStatus::Running | TaskStatus::Failed | TaskStatus::Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a whole execution. An execution starts in `Running` and ends
/// in exactly one of the terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
