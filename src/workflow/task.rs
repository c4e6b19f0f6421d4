use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_input() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A unit of work template. Per-execution live copies are wrapped in
/// [`TaskState`](crate::scheduler::TaskState).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub id: String,
    /// Display name; falls back to the id when absent.
    #[serde(default)]
    pub name: String,
    /// Tag selecting the pluggable handler for this task.
    pub kind: String,
    /// The scheduler assigns the task only to agents whose registered
    /// capability set is a superset of this one.
    #[serde(default)]
    pub required_capabilities: HashSet<String>,
    /// Opaque payload passed to the handler, after execution parameters are
    /// merged underneath it.
    #[serde(default = "default_input")]
    pub input: Value,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl WorkflowTask {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind: kind.into(),
            required_capabilities: HashSet::new(),
            input: default_input(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn require_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    pub fn require_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// `to` may not start until `from` reaches completed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub from: String,
    pub to: String,
}

impl TaskDependency {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Declarative trigger descriptor, carried through registration untouched.
/// Consumed by an external scheduler or webhook layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl WorkflowTrigger {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }
}
