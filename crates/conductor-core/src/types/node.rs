//! Task node definitions
//!
//! TaskNode is the atomic unit of a plan: one subtask, its dependencies,
//! and its terminal result once the executor has driven it.

use serde::{Deserialize, Serialize};

/// Node state machine.
///
/// `pending -> running -> done | failed`, or `pending -> skipped` when an
/// ancestor failed or the run was cancelled. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet dispatched
    #[default]
    Pending,
    /// Currently executing on an agent
    Running,
    /// Execution completed successfully
    Done,
    /// Execution failed (modeled or unexpected agent error)
    Failed,
    /// Never executed: ancestor failed or run cancelled
    Skipped,
}

impl TaskStatus {
    /// Check whether the node will never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }
}

/// Terminal output of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "output", rename_all = "snake_case")]
pub enum TaskResult {
    /// Success; the agent's textual response
    Ok(String),
    /// Failure; a diagnostic message
    Error(String),
}

impl TaskResult {
    /// Create a success result
    pub fn ok(output: impl Into<String>) -> Self {
        Self::Ok(output.into())
    }

    /// Create an error result
    pub fn error(output: impl Into<String>) -> Self {
        Self::Error(output.into())
    }

    /// Whether this is a success result
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The textual payload, success or diagnostic
    pub fn output(&self) -> &str {
        match self {
            Self::Ok(output) | Self::Error(output) => output,
        }
    }
}

/// Per-node execution overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeConfig {
    /// Extra attempts after the first call; 0 means call once, unwrapped
    #[serde(default)]
    pub retries: u32,
}

/// A single subtask in the graph.
///
/// Deserializes directly from planner JSON; the wire shape uses camelCase
/// for `dependsOn` / `assignTo`, which are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    /// Unique identifier within the graph
    pub id: String,
    /// Human/LLM-readable description of the work
    pub task: String,
    /// IDs of nodes that must be done before this one is eligible
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<String>,
    /// Agent selector (name or capability tag); absent means "any"
    #[serde(default, alias = "assignTo")]
    pub assign_to: Option<String>,
    /// Current state
    #[serde(default)]
    pub status: TaskStatus,
    /// Terminal result, absent until the node settles
    #[serde(default)]
    pub result: Option<TaskResult>,
    /// Per-node overrides
    #[serde(default)]
    pub config: NodeConfig,
}

impl TaskNode {
    /// Create a new pending node
    pub fn new(id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task: task.into(),
            depends_on: Vec::new(),
            assign_to: None,
            status: TaskStatus::Pending,
            result: None,
            config: NodeConfig::default(),
        }
    }

    /// Add dependencies
    pub fn with_depends_on(mut self, deps: Vec<String>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Pin the node to an agent name or capability tag
    pub fn with_assign_to(mut self, selector: impl Into<String>) -> Self {
        self.assign_to = Some(selector.into());
        self
    }

    /// Set the retry count override
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminal_classification() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_result_constructors_and_output() {
        let ok = TaskResult::ok("value");
        assert!(ok.is_ok());
        assert_eq!(ok.output(), "value");

        let err = TaskResult::error("boom");
        assert!(!err.is_ok());
        assert_eq!(err.output(), "boom");
    }

    #[test]
    fn test_node_deserializes_planner_camel_case() {
        let node: TaskNode = serde_json::from_value(json!({
            "id": "s2",
            "task": "summarize findings",
            "dependsOn": ["s1"],
            "assignTo": "writer"
        }))
        .expect("node");

        assert_eq!(node.id, "s2");
        assert_eq!(node.depends_on, vec!["s1".to_string()]);
        assert_eq!(node.assign_to.as_deref(), Some("writer"));
        assert_eq!(node.status, TaskStatus::Pending);
        assert!(node.result.is_none());
        assert_eq!(node.config.retries, 0);
    }

    #[test]
    fn test_node_defaults_for_missing_fields() {
        let node: TaskNode = serde_json::from_value(json!({
            "id": "s1",
            "task": "collect data"
        }))
        .expect("node");

        assert!(node.depends_on.is_empty());
        assert!(node.assign_to.is_none());
    }
}
