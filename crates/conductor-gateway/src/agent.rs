//! Gateway-backed agent adapter.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use conductor_core::agent::{AgentAdapter, AgentError};
use conductor_core::gateway::GatewayClient;
use conductor_core::types::{TaskNode, TaskResult};

/// An agent that answers nodes through the LLM gateway.
///
/// Each execution uses a fresh session key so task conversations stay
/// isolated from each other and from planner traffic.
pub struct GatewayAgent {
    name: String,
    capabilities: Vec<String>,
    client: Arc<dyn GatewayClient>,
}

impl GatewayAgent {
    pub fn new(name: impl Into<String>, client: Arc<dyn GatewayClient>) -> Self {
        Self {
            name: name.into(),
            capabilities: Vec::new(),
            client,
        }
    }

    /// Add capability tags this agent can be selected by
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }
}

#[async_trait]
impl AgentAdapter for GatewayAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn execute(&self, node: &TaskNode) -> Result<TaskResult, AgentError> {
        let id = Uuid::new_v4().simple().to_string();
        let session_key = format!("task-{}", &id[..8]);
        match self.client.chat(&node.task, &session_key).await {
            Ok(output) => Ok(TaskResult::ok(output)),
            // transport failures surface as raises so node-level retry applies
            Err(err) => Err(AgentError::new(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockGateway;

    #[test]
    fn test_execute_returns_gateway_output() {
        tokio_test::block_on(async {
            let gateway = Arc::new(MockGateway::new("forty-two"));
            let agent = GatewayAgent::new("worker", gateway.clone());

            let node = TaskNode::new("n1", "compute the answer");
            let result = agent.execute(&node).await.expect("result");
            assert_eq!(result, TaskResult::ok("forty-two"));
            assert_eq!(gateway.calls(), 1);

            let keys = gateway.session_keys();
            assert_eq!(keys.len(), 1);
            assert!(keys[0].starts_with("task-"));
        });
    }

    #[test]
    fn test_capability_tags_are_exposed() {
        let gateway = Arc::new(MockGateway::new(""));
        let agent = GatewayAgent::new("writer", gateway)
            .with_capabilities(vec!["write".to_string(), "summarize".to_string()]);
        assert_eq!(agent.name(), "writer");
        assert_eq!(agent.capabilities().len(), 2);
    }
}
