//! Agent adapters and the registry
//!
//! An agent is a named LLM-fronted worker. Adapters encode normal failure as
//! a `TaskResult::Error` in the `Ok` channel; an `Err(AgentError)` is an
//! unexpected raise, which the retry helper treats as retryable and the
//! executor converts into a node failure.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{TaskNode, TaskResult};

/// Unexpected failure raised by an agent adapter.
#[derive(Debug, Error)]
#[error("agent execution failed: {0}")]
pub struct AgentError(String);

impl AgentError {
    /// Create an error from any displayable cause
    pub fn new(cause: impl Into<String>) -> Self {
        Self(cause.into())
    }
}

impl From<String> for AgentError {
    fn from(cause: String) -> Self {
        Self(cause)
    }
}

impl From<&str> for AgentError {
    fn from(cause: &str) -> Self {
        Self(cause.to_string())
    }
}

/// A named worker the executor can dispatch nodes to.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Unique agent name
    fn name(&self) -> &str;

    /// Capability tags this agent can be selected by
    fn capabilities(&self) -> &[String] {
        &[]
    }

    /// Execute one node. Modeled failure is `Ok(TaskResult::Error(..))`;
    /// `Err` is reserved for unexpected raises.
    async fn execute(&self, node: &TaskNode) -> Result<TaskResult, AgentError>;
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent '{0}' is already registered")]
    DuplicateRegistration(String),
}

/// Registration-ordered lookup of agent adapters.
///
/// Immutable after setup; the executor only reads.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn AgentAdapter>>,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Register an agent; names must be unique
    pub fn register(&mut self, agent: Arc<dyn AgentAdapter>) -> Result<(), RegistryError> {
        if self.agents.iter().any(|a| a.name() == agent.name()) {
            return Err(RegistryError::DuplicateRegistration(
                agent.name().to_string(),
            ));
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Resolve a selector: exact name first, then any agent whose
    /// capabilities include it.
    pub fn pick(&self, selector: &str) -> Option<Arc<dyn AgentAdapter>> {
        if let Some(agent) = self.agents.iter().find(|a| a.name() == selector) {
            return Some(agent.clone());
        }
        self.agents
            .iter()
            .find(|a| a.capabilities().iter().any(|c| c == selector))
            .cloned()
    }

    /// First registered agent, the default for unpinned nodes
    pub fn first(&self) -> Option<Arc<dyn AgentAdapter>> {
        self.agents.first().cloned()
    }

    /// All agents in registration order
    pub fn list(&self) -> &[Arc<dyn AgentAdapter>] {
        &self.agents
    }

    /// Agent names in registration order
    pub fn names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name().to_string()).collect()
    }

    /// Whether no agents are registered
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of registered agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }
}
