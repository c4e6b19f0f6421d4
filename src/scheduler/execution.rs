use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

use crate::error::TaskFailure;
use crate::workflow::WorkflowTask;

use super::types::{ExecutionStatus, TaskStatus};

/// Per-task bookkeeping inside an execution: current status, retry count,
/// which agent ran the last attempt, and the final output or failure.
#[derive(Clone, Debug, Serialize)]
pub struct TaskState {
    pub task: WorkflowTask,
    pub status: TaskStatus,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<SystemTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<SystemTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskFailure>,
}

impl TaskState {
    pub fn new(task: WorkflowTask) -> Self {
        Self {
            task,
            status: TaskStatus::Pending,
            retry_count: 0,
            assigned_agent: None,
            started_at: None,
            finished_at: None,
            output: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One run of a workflow: a task-state map plus overall status and timing.
#[derive(Clone, Debug, Serialize)]
pub struct Execution {
    pub execution_id: String,
    pub workflow_id: String,
    pub parameters: Value,
    pub tasks: HashMap<String, TaskState>,
    pub status: ExecutionStatus,
    pub started_at: SystemTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<SystemTime>,
}

impl Execution {
    pub fn new(
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        parameters: Value,
        tasks: &[WorkflowTask],
    ) -> Self {
        let tasks = tasks
            .iter()
            .map(|task| (task.id.clone(), TaskState::new(task.clone())))
            .collect();
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            parameters,
            tasks,
            status: ExecutionStatus::Running,
            started_at: SystemTime::now(),
            finished_at: None,
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&TaskState> {
        self.tasks.get(task_id)
    }
}

static EXECUTION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Ids are timestamp-based with a process-wide sequence so that two
/// executions started in the same nanosecond still get distinct ids.
pub(crate) fn execution_id() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let seq = EXECUTION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("exec-{}-{}-{}", now.as_secs(), now.subsec_nanos(), seq)
}
