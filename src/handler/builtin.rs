use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{ConductorError, Result};

use super::handler::{TaskHandler, TaskInvocation};

/// Returns the invocation input unchanged.
pub struct EchoHandler {
    kind: &'static str,
}

impl EchoHandler {
    pub fn new(kind: &'static str) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl TaskHandler for EchoHandler {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn handle(&self, invocation: TaskInvocation) -> Result<Value> {
        Ok(invocation.input)
    }
}

/// Wraps an async closure as a handler.
pub struct FnHandler {
    kind: &'static str,
    func: Box<dyn Fn(TaskInvocation) -> BoxFuture<'static, Result<Value>> + Send + Sync>,
}

impl FnHandler {
    pub fn new<F>(kind: &'static str, func: F) -> Self
    where
        F: Fn(TaskInvocation) -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    {
        Self {
            kind,
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl TaskHandler for FnHandler {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn handle(&self, invocation: TaskInvocation) -> Result<Value> {
        (self.func)(invocation).await
    }
}

/// Fails a fixed number of invocations before succeeding. Exercises retry
/// policy in tests and demos.
pub struct FlakyHandler {
    kind: &'static str,
    remaining_failures: AtomicU32,
}

impl FlakyHandler {
    pub fn new(kind: &'static str, failures: u32) -> Self {
        Self {
            kind,
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl TaskHandler for FlakyHandler {
    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn handle(&self, invocation: TaskInvocation) -> Result<Value> {
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(ConductorError::Other(anyhow!(
                "induced failure for task `{}`",
                invocation.task_id
            )))
        } else {
            Ok(invocation.input)
        }
    }
}
