use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::debug;

use super::execution::Execution;
use super::types::{ExecutionStatus, TaskStatus};

/// Shared state for one live execution. The driver and the public API both
/// hold the same handle; `notify` wakes the driver after a cancellation.
pub struct ExecutionHandle {
    pub(crate) execution_id: String,
    pub(crate) record: RwLock<Execution>,
    pub(crate) notify: Notify,
}

impl ExecutionHandle {
    pub(crate) fn new(record: Execution) -> Self {
        Self {
            execution_id: record.execution_id.clone(),
            record: RwLock::new(record),
            notify: Notify::new(),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn snapshot(&self) -> Execution {
        self.record.read().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.record.read().status.is_terminal()
    }

    /// Flips the execution and every non-terminal task to `Cancelled`.
    /// Returns false when the execution had already finished. Running
    /// attempts are not interrupted; their late results are recorded
    /// without changing the cancelled status.
    pub(crate) fn cancel(&self) -> bool {
        let changed = {
            let mut guard = self.record.write();
            let record = &mut *guard;
            if record.status.is_terminal() {
                false
            } else {
                let now = SystemTime::now();
                record.status = ExecutionStatus::Cancelled;
                record.finished_at = Some(now);
                for state in record.tasks.values_mut() {
                    if !state.status.is_terminal() {
                        state.status = TaskStatus::Cancelled;
                        state.finished_at = Some(now);
                    }
                }
                true
            }
        };
        if changed {
            self.notify.notify_waiters();
        }
        changed
    }
}

const DEFAULT_RETAINED_EXECUTIONS: usize = 256;

/// Keeps every live execution plus a bounded history of finished ones.
/// When the finished set outgrows the retention cap, the oldest finished
/// executions are pruned; running executions are never evicted.
pub struct ExecutionRegistry {
    executions: RwLock<HashMap<String, Arc<ExecutionHandle>>>,
    retention: usize,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_EXECUTIONS)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            executions: RwLock::new(HashMap::new()),
            retention: retention.max(1),
        }
    }

    pub(crate) fn insert(&self, handle: Arc<ExecutionHandle>) {
        let mut executions = self.executions.write();
        executions.insert(handle.execution_id.clone(), handle);
        Self::prune(&mut executions, self.retention);
    }

    pub fn get(&self, execution_id: &str) -> Option<Arc<ExecutionHandle>> {
        self.executions.read().get(execution_id).cloned()
    }

    pub fn snapshot(&self, execution_id: &str) -> Option<Execution> {
        self.get(execution_id).map(|handle| handle.snapshot())
    }

    /// `None` when the id is unknown, otherwise whether this call was the
    /// one that cancelled the execution.
    pub fn cancel(&self, execution_id: &str) -> Option<bool> {
        self.get(execution_id).map(|handle| handle.cancel())
    }

    pub fn len(&self) -> usize {
        self.executions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.read().is_empty()
    }

    fn prune(executions: &mut HashMap<String, Arc<ExecutionHandle>>, retention: usize) {
        let mut finished: Vec<(String, SystemTime)> = executions
            .iter()
            .filter_map(|(id, handle)| {
                let record = handle.record.read();
                record
                    .status
                    .is_terminal()
                    .then(|| (id.clone(), record.finished_at.unwrap_or(record.started_at)))
            })
            .collect();
        if finished.len() <= retention {
            return;
        }
        finished.sort_by_key(|(_, finished_at)| *finished_at);
        let overflow = finished.len() - retention;
        for (id, _) in finished.into_iter().take(overflow) {
            executions.remove(&id);
            debug!(execution = %id, "pruned finished execution");
        }
    }
}

impl Default for ExecutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn finished_handle(id: &str) -> Arc<ExecutionHandle> {
        let mut record = Execution::new(id, "wf", Value::Null, &[]);
        record.status = ExecutionStatus::Completed;
        record.finished_at = Some(SystemTime::now());
        Arc::new(ExecutionHandle::new(record))
    }

    #[test]
    fn cancel_is_idempotent() {
        let record = Execution::new("exec-1", "wf", Value::Null, &[]);
        let handle = ExecutionHandle::new(record);
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(handle.snapshot().status, ExecutionStatus::Cancelled);
    }

    #[test]
    fn prune_evicts_oldest_finished_first() {
        let registry = ExecutionRegistry::with_retention(2);
        registry.insert(finished_handle("exec-old"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.insert(finished_handle("exec-mid"));
        std::thread::sleep(std::time::Duration::from_millis(5));
        registry.insert(finished_handle("exec-new"));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("exec-old").is_none());
        assert!(registry.get("exec-mid").is_some());
        assert!(registry.get("exec-new").is_some());
    }

    #[test]
    fn running_executions_survive_pruning() {
        let registry = ExecutionRegistry::with_retention(1);
        let running = Arc::new(ExecutionHandle::new(Execution::new(
            "exec-running",
            "wf",
            Value::Null,
            &[],
        )));
        registry.insert(running);
        registry.insert(finished_handle("exec-a"));
        registry.insert(finished_handle("exec-b"));

        assert!(registry.get("exec-running").is_some());
        assert!(registry.get("exec-b").is_some());
        assert!(registry.get("exec-a").is_none());
    }
}
