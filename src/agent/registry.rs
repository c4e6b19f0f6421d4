use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::role::AgentRole;

#[derive(Clone)]
struct AgentEntry {
    capabilities: HashSet<String>,
    limit: Option<usize>,
    active: Arc<AtomicUsize>,
}

/// Capability-tagged agent pool shared by every execution.
///
/// Registration is an idempotent upsert; re-registering an agent replaces its
/// capability set and limit but keeps the live in-flight counter, so work
/// already assigned to the agent stays counted against it.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentEntry>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Registers or replaces an agent with no concurrency limit.
    pub fn register<I, S>(&self, agent_id: impl Into<String>, capabilities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(
            agent_id.into(),
            capabilities.into_iter().map(Into::into).collect(),
            None,
        );
    }

    /// Registers or replaces an agent capped to `limit` concurrent tasks.
    pub fn register_with_limit<I, S>(&self, agent_id: impl Into<String>, capabilities: I, limit: usize)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(
            agent_id.into(),
            capabilities.into_iter().map(Into::into).collect(),
            Some(limit.max(1)),
        );
    }

    fn insert(&self, agent_id: String, capabilities: HashSet<String>, limit: Option<usize>) {
        let mut agents = self.agents.write();
        match agents.get_mut(&agent_id) {
            Some(entry) => {
                entry.capabilities = capabilities;
                entry.limit = limit;
            }
            None => {
                agents.insert(
                    agent_id.clone(),
                    AgentEntry {
                        capabilities,
                        limit,
                        active: Arc::new(AtomicUsize::new(0)),
                    },
                );
            }
        }
        debug!(agent = %agent_id, "agent registered");
    }

    /// Removes an agent. Tasks already assigned to it run to completion;
    /// only future scheduling decisions are affected. Returns false when the
    /// id was not registered.
    pub fn unregister(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().remove(agent_id).is_some();
        if removed {
            debug!(agent = %agent_id, "agent unregistered");
        }
        removed
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.read().contains_key(agent_id)
    }

    pub fn capabilities(&self, agent_id: &str) -> Option<HashSet<String>> {
        self.agents
            .read()
            .get(agent_id)
            .map(|entry| entry.capabilities.clone())
    }

    /// Number of attempts currently assigned to the agent (0 if unknown).
    pub fn active_assignments(&self, agent_id: &str) -> usize {
        self.agents
            .read()
            .get(agent_id)
            .map(|entry| entry.active.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Agents from `roles` whose registered capability set covers `required`,
    /// ordered by descending priority. Ties keep the order roles are declared
    /// in; duplicate ids are considered once (first declaration wins); ids
    /// not currently registered are skipped.
    pub fn find_capable(&self, roles: &[AgentRole], required: &HashSet<String>) -> Vec<AgentCandidate> {
        let agents = self.agents.read();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for role in roles {
            if !seen.insert(role.agent_id.as_str()) {
                continue;
            }
            let Some(entry) = agents.get(&role.agent_id) else {
                continue;
            };
            if !required.is_subset(&entry.capabilities) {
                continue;
            }
            candidates.push(AgentCandidate {
                agent_id: role.agent_id.clone(),
                priority: role.priority,
                limit: entry.limit,
                active: Arc::clone(&entry.active),
            });
        }
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
        candidates
    }
}

/// A registered agent eligible for one task, as returned by
/// [`AgentRegistry::find_capable`].
pub struct AgentCandidate {
    agent_id: String,
    priority: i32,
    limit: Option<usize>,
    active: Arc<AtomicUsize>,
}

impl AgentCandidate {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Takes one concurrency slot, or returns `None` when the agent is
    /// saturated. Always succeeds for agents registered without a limit.
    pub fn try_assign(&self) -> Option<AgentPermit> {
        match self.limit {
            None => {
                self.active.fetch_add(1, Ordering::SeqCst);
                Some(AgentPermit {
                    active: Arc::clone(&self.active),
                })
            }
            Some(limit) => {
                let mut current = self.active.load(Ordering::SeqCst);
                loop {
                    if current >= limit {
                        return None;
                    }
                    match self.active.compare_exchange(
                        current,
                        current + 1,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    ) {
                        Ok(_) => {
                            return Some(AgentPermit {
                                active: Arc::clone(&self.active),
                            })
                        }
                        Err(actual) => current = actual,
                    }
                }
            }
        }
    }
}

/// Releases the agent's concurrency slot when dropped.
///
/// The counter is shared with the registry entry through an `Arc`, so the
/// release lands even if the agent was unregistered or re-registered while
/// the attempt was in flight.
pub struct AgentPermit {
    active: Arc<AtomicUsize>,
}

impl Drop for AgentPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
