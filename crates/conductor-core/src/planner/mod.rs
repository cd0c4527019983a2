//! Planner module
//!
//! The Planner is responsible for:
//! - Turning a free-form goal into a prompt the LLM can answer with DAG JSON
//! - Calling exactly one LLM source: a planner agent or a gateway client
//! - Parsing and validating the response into a TaskGraph
//!
//! The Planner does NOT handle:
//! - Executing the graph
//! - Retry or rate limiting of the planning call itself

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{AgentAdapter, AgentRegistry};
use crate::gateway::{GatewayClient, GatewayError};
use crate::schema;
use crate::types::{GraphError, TaskGraph, TaskNode};
use crate::util::truncate_for_log;

const MAX_PROMPT_LOG_CHARS: usize = 4_000;
const MAX_RESPONSE_PREVIEW_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = r#"You are the planning component of a task orchestrator. Decompose the goal into a directed acyclic graph of subtasks and return ONLY one JSON object of this shape:
{"nodes":[{"id":"s1","task":"...","dependsOn":["s0"],"assignTo":"agent-name"}],"synthesizerPrompt":"..."}

Planning rules:
1) Return ONLY the JSON object; no prose and no code fences.
2) Every node id must be unique and stable.
3) dependsOn may only reference declared node ids and must not form cycles.
4) Each task must be a self-contained instruction an agent can execute.
5) assignTo is optional; use an available agent name or capability, or omit it.
6) synthesizerPrompt is optional; include it when results need combining.
7) Prefer the smallest set of subtasks that covers the goal."#;

/// Planner errors
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("planner returned malformed JSON: {0}")]
    ParseFailed(String),

    #[error("plan validation failed: {0}")]
    ValidationFailed(String),

    #[error("planner agent failed: {0}")]
    AgentExecution(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("planner configuration missing: {0}")]
    ConfigMissing(String),
}

/// The single LLM source behind a planner.
enum PlannerSource {
    Agent(Arc<dyn AgentAdapter>),
    Gateway(Arc<dyn GatewayClient>),
}

/// Goal -> TaskGraph planner.
pub struct Planner {
    source: PlannerSource,
    max_steps: Option<usize>,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl Planner {
    /// Plan through a full agent adapter
    pub fn with_agent(agent: Arc<dyn AgentAdapter>) -> Self {
        Self {
            source: PlannerSource::Agent(agent),
            max_steps: None,
        }
    }

    /// Plan through a gateway client
    pub fn with_gateway(client: Arc<dyn GatewayClient>) -> Self {
        Self {
            source: PlannerSource::Gateway(client),
            max_steps: None,
        }
    }

    /// Build from optional sources; a planner agent takes precedence.
    pub fn from_sources(
        agent: Option<Arc<dyn AgentAdapter>>,
        gateway: Option<Arc<dyn GatewayClient>>,
    ) -> Result<Self, PlanError> {
        match (agent, gateway) {
            (Some(agent), _) => Ok(Self::with_agent(agent)),
            (None, Some(client)) => Ok(Self::with_gateway(client)),
            (None, None) => Err(PlanError::ConfigMissing(
                "planner needs a planner agent or a gateway client".to_string(),
            )),
        }
    }

    /// Cap the number of nodes a plan may contain
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Plan a goal into a validated TaskGraph.
    pub async fn plan(&self, goal: &str, registry: &AgentRegistry) -> Result<TaskGraph, PlanError> {
        let prompt = build_prompt(goal, registry);
        info!(
            goal_len = goal.len(),
            agent_count = registry.len(),
            "planning goal"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                prompt = %truncate_for_log(&prompt, MAX_PROMPT_LOG_CHARS),
                "planner prompt"
            );
        }

        let raw = match &self.source {
            PlannerSource::Gateway(client) => {
                let session_key = fresh_session_key();
                debug!(session_key = %session_key, "planner gateway call");
                client.chat(&prompt, &session_key).await?
            }
            PlannerSource::Agent(agent) => {
                let node = TaskNode::new("plan", prompt);
                match agent.execute(&node).await {
                    Ok(result) if result.is_ok() => result.output().to_string(),
                    Ok(result) => {
                        return Err(PlanError::AgentExecution(result.output().to_string()))
                    }
                    Err(err) => return Err(PlanError::AgentExecution(err.to_string())),
                }
            }
        };

        let graph = parse_plan(goal, &raw, self.max_steps)?;
        info!(
            node_count = graph.nodes.len(),
            has_synthesizer = graph.synthesizer_prompt.is_some(),
            "plan accepted"
        );
        Ok(graph)
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    nodes: Vec<TaskNode>,
    #[serde(default, alias = "synthesizerPrompt")]
    synthesizer_prompt: Option<String>,
}

fn build_prompt(goal: &str, registry: &AgentRegistry) -> String {
    let mut prompt = String::new();
    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n\nGoal:\n");
    prompt.push_str(goal);
    prompt.push('\n');
    if !registry.is_empty() {
        prompt.push_str(&format!(
            "\nAvailable agents: {}\n",
            registry.names().join(", ")
        ));
    }
    prompt
}

fn fresh_session_key() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("plan-{}", &id[..8])
}

/// Strip one optional leading fenced-code marker (with any info string) and
/// one trailing marker, then trim.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_plan(goal: &str, raw: &str, max_steps: Option<usize>) -> Result<TaskGraph, PlanError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned).map_err(|err| {
        warn!(
            response_preview = %truncate_for_log(raw, MAX_RESPONSE_PREVIEW_CHARS),
            "planner response is not valid JSON"
        );
        PlanError::ParseFailed(err.to_string())
    })?;

    schema::validate_plan_response(&value)
        .map_err(|err| PlanError::ValidationFailed(err.to_string()))?;

    let parsed: RawPlan = serde_json::from_value(value)
        .map_err(|err| PlanError::ValidationFailed(err.to_string()))?;

    if let Some(cap) = max_steps {
        if parsed.nodes.len() > cap {
            return Err(PlanError::ValidationFailed(format!(
                "plan has {} nodes, exceeding the limit of {}",
                parsed.nodes.len(),
                cap
            )));
        }
    }

    Ok(TaskGraph::new(goal, parsed.nodes, parsed.synthesizer_prompt)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use crate::types::TaskResult;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct StaticGateway {
        response: String,
        session_keys: Mutex<Vec<String>>,
    }

    impl StaticGateway {
        fn new(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_string(),
                session_keys: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GatewayClient for StaticGateway {
        async fn chat(&self, _prompt: &str, session_key: &str) -> Result<String, GatewayError> {
            self.session_keys.lock().await.push(session_key.to_string());
            Ok(self.response.clone())
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl GatewayClient for FailingGateway {
        async fn chat(&self, _prompt: &str, _session_key: &str) -> Result<String, GatewayError> {
            Err(GatewayError::Timeout("deadline exceeded".to_string()))
        }
    }

    struct PlannerAgent {
        response: Result<TaskResult, String>,
    }

    #[async_trait]
    impl AgentAdapter for PlannerAgent {
        fn name(&self) -> &str {
            "planner"
        }

        async fn execute(&self, _node: &TaskNode) -> Result<TaskResult, AgentError> {
            self.response.clone().map_err(AgentError::new)
        }
    }

    const PLAN_JSON: &str = r#"{"nodes":[
        {"id":"s1","task":"collect data"},
        {"id":"s2","task":"summarize","dependsOn":["s1"],"assignTo":"writer"}
    ],"synthesizerPrompt":"merge results"}"#;

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```json\n{\"a\":1}\n```  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_prompt_lists_agents_only_when_registered() {
        let empty = AgentRegistry::new();
        assert!(!build_prompt("goal", &empty).contains("Available agents"));

        let mut registry = AgentRegistry::new();
        registry
            .register(Arc::new(PlannerAgent {
                response: Ok(TaskResult::ok("")),
            }))
            .expect("register");
        let prompt = build_prompt("do the thing", &registry);
        assert!(prompt.contains("Available agents: planner"));
        assert!(prompt.contains("Goal:\ndo the thing"));
    }

    #[test]
    fn test_plan_via_gateway_builds_graph_with_fresh_session_keys() {
        tokio_test::block_on(async {
            let gateway = StaticGateway::new(&format!("```json\n{}\n```", PLAN_JSON));
            let planner = Planner::with_gateway(gateway.clone());
            let registry = AgentRegistry::new();

            let graph = planner.plan("report", &registry).await.expect("graph");
            assert_eq!(graph.nodes.len(), 2);
            assert_eq!(graph.goal, "report");
            assert_eq!(graph.synthesizer_prompt.as_deref(), Some("merge results"));
            assert_eq!(graph.node("s2").and_then(|n| n.assign_to.clone()), Some("writer".to_string()));

            planner.plan("report", &registry).await.expect("second plan");
            let keys = gateway.session_keys.lock().await.clone();
            assert_eq!(keys.len(), 2);
            assert!(keys.iter().all(|k| k.starts_with("plan-")));
            assert_ne!(keys[0], keys[1]);
        });
    }

    #[test]
    fn test_plan_via_planner_agent() {
        tokio_test::block_on(async {
            let planner = Planner::with_agent(Arc::new(PlannerAgent {
                response: Ok(TaskResult::ok(PLAN_JSON)),
            }));
            let graph = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect("graph");
            assert_eq!(graph.nodes.len(), 2);
        });
    }

    #[test]
    fn test_planner_agent_error_result_aborts_planning() {
        tokio_test::block_on(async {
            let planner = Planner::with_agent(Arc::new(PlannerAgent {
                response: Ok(TaskResult::error("model unavailable")),
            }));
            let err = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect_err("planner failure");
            assert!(matches!(err, PlanError::AgentExecution(msg) if msg.contains("model unavailable")));
        });
    }

    #[test]
    fn test_gateway_failure_propagates_classified() {
        tokio_test::block_on(async {
            let planner = Planner::with_gateway(Arc::new(FailingGateway));
            let err = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect_err("gateway failure");
            assert!(matches!(err, PlanError::Gateway(GatewayError::Timeout(_))));
        });
    }

    #[test]
    fn test_malformed_json_is_a_parse_failure() {
        tokio_test::block_on(async {
            let planner = Planner::with_gateway(StaticGateway::new("here is your plan!"));
            let err = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect_err("parse failure");
            assert!(matches!(err, PlanError::ParseFailed(_)));
        });
    }

    #[test]
    fn test_empty_node_list_fails_validation() {
        tokio_test::block_on(async {
            let planner = Planner::with_gateway(StaticGateway::new(r#"{"nodes":[]}"#));
            let err = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect_err("validation failure");
            assert!(matches!(err, PlanError::ValidationFailed(_)));
        });
    }

    #[test]
    fn test_duplicate_ids_surface_as_graph_error() {
        tokio_test::block_on(async {
            let planner = Planner::with_gateway(StaticGateway::new(
                r#"{"nodes":[{"id":"s1","task":"a"},{"id":"s1","task":"b"}]}"#,
            ));
            let err = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect_err("graph failure");
            assert!(matches!(err, PlanError::Graph(GraphError::DuplicateId { id }) if id == "s1"));
        });
    }

    #[test]
    fn test_max_steps_cap_rejects_oversized_plans() {
        tokio_test::block_on(async {
            let planner =
                Planner::with_gateway(StaticGateway::new(PLAN_JSON)).with_max_steps(Some(1));
            let err = planner
                .plan("report", &AgentRegistry::new())
                .await
                .expect_err("cap exceeded");
            assert!(matches!(err, PlanError::ValidationFailed(msg) if msg.contains("limit of 1")));
        });
    }

    #[test]
    fn test_from_sources_requires_at_least_one() {
        let err = Planner::from_sources(None, None).expect_err("missing sources");
        assert!(matches!(err, PlanError::ConfigMissing(_)));
    }
}
