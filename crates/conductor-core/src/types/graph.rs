//! Task graph
//!
//! The TaskGraph is the validated DAG the planner hands to the executor:
//! - Construction enforces unique ids, declared dependencies, and acyclicity
//! - Readiness / completion predicates drive the scheduling loop
//! - A forward adjacency index built at construction backs failure propagation

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use super::{TaskNode, TaskResult, TaskStatus};

/// Graph construction errors. Each names the offending node id.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node id '{id}'")]
    DuplicateId { id: String },

    #[error("node '{id}' depends on undeclared node '{dependency}'")]
    UnknownDependency { id: String, dependency: String },

    #[error("dependency cycle through node '{id}'")]
    Cycle { id: String },
}

/// A goal plus its subtask DAG.
///
/// Created by the planner, mutated exclusively by the executor during one
/// `execute` call, then returned to the caller inside the execution report.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// The free-form goal this graph decomposes
    pub goal: String,
    /// Node sequence; ordering is not semantically significant
    pub nodes: Vec<TaskNode>,
    /// Optional prompt for downstream result combination (not consumed here)
    pub synthesizer_prompt: Option<String>,
    /// id -> position in `nodes`
    index: HashMap<String, usize>,
    /// id -> ids of nodes that depend on it
    dependents: HashMap<String, Vec<String>>,
}

impl TaskGraph {
    /// Validate and build a graph.
    ///
    /// Rejects duplicate ids, dependencies on undeclared nodes, and cycles.
    pub fn new(
        goal: impl Into<String>,
        nodes: Vec<TaskNode>,
        synthesizer_prompt: Option<String>,
    ) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (pos, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), pos).is_some() {
                return Err(GraphError::DuplicateId {
                    id: node.id.clone(),
                });
            }
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for node in &nodes {
            for dep in &node.depends_on {
                if !index.contains_key(dep.as_str()) {
                    return Err(GraphError::UnknownDependency {
                        id: node.id.clone(),
                        dependency: dep.clone(),
                    });
                }
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }

        if let Some(id) = find_cycle(&nodes, &index) {
            return Err(GraphError::Cycle { id });
        }

        Ok(Self {
            goal: goal.into(),
            nodes,
            synthesizer_prompt,
            index,
            dependents,
        })
    }

    /// Get a node by id
    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.index.get(id).map(|pos| &self.nodes[*pos])
    }

    fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.node(id).map(|n| n.status)
    }

    /// Pending nodes whose every dependency is done, in node-sequence order
    pub fn ready_nodes(&self) -> Vec<&TaskNode> {
        self.nodes
            .iter()
            .filter(|node| {
                node.status == TaskStatus::Pending
                    && node
                        .depends_on
                        .iter()
                        .all(|dep| self.status_of(dep) == Some(TaskStatus::Done))
            })
            .collect()
    }

    /// Whether every node reached a terminal status
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|node| node.status.is_terminal())
    }

    /// Whether every node is done
    pub fn all_done(&self) -> bool {
        self.nodes.iter().all(|node| node.status == TaskStatus::Done)
    }

    /// Mark a pending node as running
    pub fn mark_running(&mut self, id: &str) {
        if let Some(&pos) = self.index.get(id) {
            let node = &mut self.nodes[pos];
            if node.status == TaskStatus::Pending {
                node.status = TaskStatus::Running;
            }
        }
    }

    /// Settle a node as done with its result
    pub fn mark_done(&mut self, id: &str, result: TaskResult) {
        self.settle(id, TaskStatus::Done, result);
    }

    /// Settle a node as failed with its diagnostic result
    pub fn mark_failed(&mut self, id: &str, result: TaskResult) {
        self.settle(id, TaskStatus::Failed, result);
    }

    fn settle(&mut self, id: &str, status: TaskStatus, result: TaskResult) {
        if let Some(&pos) = self.index.get(id) {
            let node = &mut self.nodes[pos];
            if !node.status.is_terminal() {
                node.status = status;
                node.result = Some(result);
            }
        }
    }

    /// Mark a still-pending node as skipped
    pub fn mark_skipped(&mut self, id: &str) {
        if let Some(&pos) = self.index.get(id) {
            let node = &mut self.nodes[pos];
            if node.status == TaskStatus::Pending {
                node.status = TaskStatus::Skipped;
            }
        }
    }

    /// Mark every still-pending node as skipped (cancellation path)
    pub fn skip_pending(&mut self) {
        for node in &mut self.nodes {
            if node.status == TaskStatus::Pending {
                node.status = TaskStatus::Skipped;
            }
        }
    }

    /// Transitively mark still-pending descendants of `failed_id` as skipped.
    ///
    /// Running descendants are not rolled back; traversal continues through
    /// them so their own pending descendants are still reached.
    pub fn skip_downstream(&mut self, failed_id: &str) {
        let mut queue: VecDeque<String> = self
            .dependents
            .get(failed_id)
            .cloned()
            .unwrap_or_default()
            .into();
        // shared fan-in may enqueue a node more than once
        let mut seen: HashSet<String> = HashSet::new();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(&pos) = self.index.get(&id) {
                if self.nodes[pos].status == TaskStatus::Pending {
                    self.nodes[pos].status = TaskStatus::Skipped;
                    tracing::debug!(node_id = %id, upstream = %failed_id, "node skipped after upstream failure");
                }
            }
            if let Some(children) = self.dependents.get(&id) {
                queue.extend(children.iter().cloned());
            }
        }
    }
}

fn find_cycle(nodes: &[TaskNode], index: &HashMap<String, usize>) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn visit(
        id: &str,
        nodes: &[TaskNode],
        index: &HashMap<String, usize>,
        colors: &mut HashMap<String, Color>,
    ) -> Option<String> {
        colors.insert(id.to_string(), Color::Gray);
        if let Some(&pos) = index.get(id) {
            for dep in &nodes[pos].depends_on {
                match colors.get(dep.as_str()).copied().unwrap_or(Color::White) {
                    Color::Gray => return Some(dep.clone()),
                    Color::Black => {}
                    Color::White => {
                        if let Some(hit) = visit(dep, nodes, index, colors) {
                            return Some(hit);
                        }
                    }
                }
            }
        }
        colors.insert(id.to_string(), Color::Black);
        None
    }

    let mut colors = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if colors.get(node.id.as_str()).copied().unwrap_or(Color::White) == Color::White {
            if let Some(hit) = visit(&node.id, nodes, index, &mut colors) {
                return Some(hit);
            }
        }
    }
    None
}
