use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One handler call: the task's merged input plus enough identity for the
/// handler to correlate logs and side effects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub execution_id: String,
    pub task_id: String,
    pub agent_id: String,
    pub input: Value,
}

/// Task-kind-specific logic supplied by the embedding application.
///
/// Handlers run on their own spawned task under the task's timeout; a panic
/// is contained and recorded as a handler failure.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task kind this handler serves.
    fn kind(&self) -> &'static str;
    async fn handle(&self, invocation: TaskInvocation) -> Result<Value>;
}
