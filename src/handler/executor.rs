use std::sync::Arc;

use serde_json::Value;
use tokio::time::timeout;
use tracing::warn;

use crate::error::TaskFailure;
use crate::workflow::WorkflowTask;

use super::handler::TaskInvocation;
use super::registry::HandlerRegistry;

/// Runs one task attempt: looks up the handler for the task's kind, merges
/// execution parameters under the task input, and enforces the task timeout.
///
/// The handler future runs on its own spawned task, so a panicking handler is
/// contained and reported as a failure instead of tearing down the scheduler.
pub struct TaskExecutor {
    handlers: Arc<HandlerRegistry>,
}

impl TaskExecutor {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self {
            handlers: Arc::new(handlers),
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub async fn invoke(
        &self,
        execution_id: &str,
        agent_id: &str,
        task: &WorkflowTask,
        parameters: &Value,
    ) -> std::result::Result<Value, TaskFailure> {
        let Some(handler) = self.handlers.get(&task.kind) else {
            return Err(TaskFailure::HandlerNotRegistered {
                kind: task.kind.clone(),
            });
        };

        let invocation = TaskInvocation {
            execution_id: execution_id.to_string(),
            task_id: task.id.clone(),
            agent_id: agent_id.to_string(),
            input: merge_parameters(&task.input, parameters),
        };

        let mut attempt = tokio::spawn(async move { handler.handle(invocation).await });

        match timeout(task.timeout(), &mut attempt).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(error))) => Err(TaskFailure::Handler {
                message: error.to_string(),
            }),
            Ok(Err(join_error)) => {
                let message = if join_error.is_panic() {
                    warn!(task = %task.id, kind = %task.kind, "handler panicked");
                    "handler panicked".to_string()
                } else {
                    format!("handler task failed: {join_error}")
                };
                Err(TaskFailure::Handler { message })
            }
            Err(_) => {
                attempt.abort();
                Err(TaskFailure::HandlerTimeout {
                    timeout_ms: task.timeout_ms,
                })
            }
        }
    }
}

/// Execution parameters fill the gaps in the task's own input; on a key
/// conflict the task input wins. Non-object payloads pass through untouched.
fn merge_parameters(input: &Value, parameters: &Value) -> Value {
    let mut merged = input.clone();
    if let (Some(merged_obj), Some(params_obj)) = (merged.as_object_mut(), parameters.as_object()) {
        for (key, value) in params_obj {
            merged_obj.entry(key.clone()).or_insert(value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::builtin::EchoHandler;
    use crate::handler::handler::TaskHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct PanickingHandler;

    #[async_trait]
    impl TaskHandler for PanickingHandler {
        fn kind(&self) -> &'static str {
            "panics"
        }

        async fn handle(&self, _invocation: TaskInvocation) -> crate::error::Result<Value> {
            panic!("boom");
        }
    }

    struct SleepyHandler;

    #[async_trait]
    impl TaskHandler for SleepyHandler {
        fn kind(&self) -> &'static str {
            "sleepy"
        }

        async fn handle(&self, invocation: TaskInvocation) -> crate::error::Result<Value> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(invocation.input)
        }
    }

    fn executor() -> TaskExecutor {
        let mut handlers = HandlerRegistry::new();
        handlers.register(Arc::new(EchoHandler::new("echo")));
        handlers.register(Arc::new(PanickingHandler));
        handlers.register(Arc::new(SleepyHandler));
        TaskExecutor::new(handlers)
    }

    #[test]
    fn merge_lets_task_input_win() {
        let merged = merge_parameters(&json!({"a": 1}), &json!({"a": 99, "b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn merge_ignores_non_object_payloads() {
        assert_eq!(merge_parameters(&json!("text"), &json!({"a": 1})), json!("text"));
        assert_eq!(merge_parameters(&json!({"a": 1}), &json!(42)), json!({"a": 1}));
    }

    #[tokio::test]
    async fn missing_handler_is_terminal_failure() {
        let task = WorkflowTask::new("t", "unknown_kind");
        let failure = executor()
            .invoke("exec", "agent", &task, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(failure, TaskFailure::HandlerNotRegistered { ref kind } if kind == "unknown_kind"));
        assert!(!failure.is_retryable());
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let task = WorkflowTask::new("t", "panics");
        let failure = executor()
            .invoke("exec", "agent", &task, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(failure, TaskFailure::Handler { ref message } if message.contains("panicked")));
        assert!(failure.is_retryable());
    }

    #[tokio::test]
    async fn timeout_aborts_the_attempt() {
        let task = WorkflowTask::new("t", "sleepy").with_timeout(Duration::from_millis(50));
        let failure = executor()
            .invoke("exec", "agent", &task, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(failure, TaskFailure::HandlerTimeout { timeout_ms: 50 }));
        assert!(failure.is_retryable());
    }

    #[tokio::test]
    async fn success_returns_merged_input() -> anyhow::Result<()> {
        let task = WorkflowTask::new("t", "echo").with_input(json!({"keep": true}));
        let output = executor()
            .invoke("exec", "agent", &task, &json!({"extra": 1}))
            .await
            .map_err(|failure| anyhow::anyhow!(failure.to_string()))?;
        assert_eq!(output, json!({"keep": true, "extra": 1}));
        Ok(())
    }
}
