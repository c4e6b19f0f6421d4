use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{ConductorError, Result};

use super::definition::WorkflowDefinition;

/// Partial order of a workflow's tasks, derived from its declared
/// dependencies. Built once at registration and shared by every execution.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Task ids in the order the definition declares them. Ready tasks are
    /// dispatched in this order, which keeps scheduling deterministic.
    order: Vec<String>,
    /// task -> its prerequisites
    dependencies: HashMap<String, Vec<String>>,
    /// task -> tasks waiting on it
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Builds the graph, rejecting duplicate task ids, dependency endpoints
    /// that name no declared task, and cycles.
    pub fn build(definition: &WorkflowDefinition) -> Result<Self> {
        let mut order = Vec::with_capacity(definition.tasks.len());
        let mut known = HashSet::new();
        for task in &definition.tasks {
            if !known.insert(task.id.clone()) {
                return Err(ConductorError::DuplicateTask {
                    workflow: definition.id.clone(),
                    task: task.id.clone(),
                });
            }
            order.push(task.id.clone());
        }

        let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for dependency in &definition.dependencies {
            for endpoint in [&dependency.from, &dependency.to] {
                if !known.contains(endpoint.as_str()) {
                    return Err(ConductorError::UnknownDependency {
                        workflow: definition.id.clone(),
                        task: endpoint.clone(),
                    });
                }
            }
            // Redeclared edges are tolerated but stored once.
            let forward = dependents.entry(dependency.from.clone()).or_default();
            if !forward.contains(&dependency.to) {
                forward.push(dependency.to.clone());
                dependencies
                    .entry(dependency.to.clone())
                    .or_default()
                    .push(dependency.from.clone());
            }
        }

        let graph = Self {
            order,
            dependencies,
            dependents,
        };
        let (_, mut stuck) = graph.peel();
        if !stuck.is_empty() {
            return Err(ConductorError::CyclicDependency {
                workflow: definition.id.clone(),
                task: stuck.swap_remove(0),
            });
        }
        Ok(graph)
    }

    /// Tasks with no prerequisites, in declaration order.
    pub fn initial_ready(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.dependencies_of(id).is_empty())
            .cloned()
            .collect()
    }

    pub fn dependencies_of(&self, task_id: &str) -> &[String] {
        self.dependencies
            .get(task_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, task_id: &str) -> &[String] {
        self.dependents
            .get(task_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Dependents of `completed_id` whose prerequisites are all satisfied
    /// according to `is_completed`, in declaration order.
    pub fn newly_ready<F>(&self, completed_id: &str, is_completed: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let waiting: HashSet<&str> = self
            .dependents_of(completed_id)
            .iter()
            .map(String::as_str)
            .collect();
        self.order
            .iter()
            .filter(|id| waiting.contains(id.as_str()))
            .filter(|id| self.dependencies_of(id).iter().all(|dep| is_completed(dep)))
            .cloned()
            .collect()
    }

    /// A topological order of the tasks, deterministic for a given
    /// declaration order.
    pub fn topological_order(&self) -> Vec<String> {
        self.peel().0
    }

    pub fn task_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Kahn's algorithm: repeatedly peels tasks whose prerequisites are all
    /// peeled. Returns the peeled order and the tasks left stuck, which is
    /// non-empty exactly when the graph has a cycle.
    fn peel(&self) -> (Vec<String>, Vec<String>) {
        let mut in_degree: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|id| (id.as_str(), self.dependencies_of(id).len()))
            .collect();

        let mut queue: VecDeque<&str> = self
            .order
            .iter()
            .filter(|id| in_degree[id.as_str()] == 0)
            .map(String::as_str)
            .collect();

        let mut peeled = Vec::with_capacity(self.order.len());
        while let Some(id) = queue.pop_front() {
            peeled.push(id.to_string());
            for dependent in self.dependents_of(id) {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        let stuck = self
            .order
            .iter()
            .filter(|id| in_degree[id.as_str()] > 0)
            .cloned()
            .collect();
        (peeled, stuck)
    }
}
