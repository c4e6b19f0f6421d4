use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How an agent participates in a workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRoleKind {
    Coordinator,
    Executor,
    Validator,
    Observer,
}

/// One agent's declared participation in a workflow definition.
///
/// The `capabilities` listed here are what the workflow author expects the
/// agent to offer; the live [`AgentRegistry`](super::AgentRegistry) is
/// authoritative when tasks are matched to agents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentRole {
    pub agent_id: String,
    pub role: AgentRoleKind,
    #[serde(default)]
    pub capabilities: HashSet<String>,
    #[serde(default)]
    pub priority: i32,
}

impl AgentRole {
    pub fn new(agent_id: impl Into<String>, role: AgentRoleKind) -> Self {
        Self {
            agent_id: agent_id.into(),
            role,
            capabilities: HashSet::new(),
            priority: 0,
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
