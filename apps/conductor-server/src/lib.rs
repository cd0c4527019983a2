//! HTTP submission surface.
//!
//! Thin axum app over the core pipeline: a validated goal submission is
//! planned into a graph, executed, and summarized back to the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use conductor_config::ConductorConfig;
use conductor_core::agent::AgentRegistry;
use conductor_core::cache::TaskCache;
use conductor_core::executor::{ExecuteOptions, Executor};
use conductor_core::gateway::GatewayClient;
use conductor_core::planner::{PlanError, Planner};
use conductor_core::rate_limit::AgentRateLimiter;
use conductor_core::retry::RetryPolicy;
use conductor_core::schema;
use conductor_core::types::TaskStatus;
use conductor_gateway::{GatewayAgent, HttpGatewayClient, HttpGatewayConfig};

#[derive(Clone)]
struct AppState {
    gateway: Arc<dyn GatewayClient>,
    registry: Arc<AgentRegistry>,
    executor: Arc<Executor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    goal: String,
    max_concurrency: Option<usize>,
    max_steps: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct NodeView {
    id: String,
    status: TaskStatus,
    output: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    run_id: String,
    created_at: DateTime<Utc>,
    success: bool,
    duration_ms: u64,
    synthesizer_prompt: Option<String>,
    nodes: Vec<NodeView>,
}

fn build_state(
    config: &ConductorConfig,
    gateway: Arc<dyn GatewayClient>,
) -> anyhow::Result<AppState> {
    let mut registry = AgentRegistry::new();
    let worker = GatewayAgent::new("worker", gateway.clone());
    registry
        .register(Arc::new(worker))
        .context("register default worker")?;
    let registry = Arc::new(registry);

    let cache = Arc::new(TaskCache::new(config.cache.enabled, config.cache.ttl()));
    let rate_limiter = Arc::new(AgentRateLimiter::new(
        config.rate_limit.enabled,
        config.rate_limit.requests_per_interval,
        config.rate_limit.interval(),
    ));
    let retry_policy = RetryPolicy::new(
        config.retry.max_attempts,
        config.retry.base_delay(),
        config.retry.max_delay(),
    );
    let executor = Arc::new(
        Executor::new(registry.clone(), cache, rate_limiter)
            .with_max_concurrency(config.limits.max_concurrency)
            .with_retry_policy(retry_policy),
    );

    Ok(AppState {
        gateway,
        registry,
        executor,
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/goals", post(submit_goal))
        .with_state(state)
}

/// Run the submission surface until the process is stopped.
pub async fn run_server(config: ConductorConfig, listen: SocketAddr) -> anyhow::Result<()> {
    let gateway = HttpGatewayClient::new(HttpGatewayConfig {
        endpoint: config.gateway.endpoint.clone(),
        api_key: config.gateway.api_key.clone(),
        model: config.gateway.model.clone(),
        timeout: config.gateway.timeout(),
        ..HttpGatewayConfig::default()
    })
    .context("build gateway client")?;

    let state = build_state(&config, Arc::new(gateway))?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .context("bind server listener failed")?;
    tracing::info!(listen = %listen, "conductor-server listening");
    axum::serve(listener, app)
        .await
        .context("server terminated with error")
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({"status":"ok"}))
}

async fn submit_goal(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<RunResponse>, (StatusCode, Json<ErrorBody>)> {
    schema::validate_submission(&payload).map_err(|err| {
        error_response(StatusCode::BAD_REQUEST, "invalid_submission", err.to_string())
    })?;
    let request: SubmitRequest = serde_json::from_value(payload).map_err(|err| {
        error_response(StatusCode::BAD_REQUEST, "invalid_submission", err.to_string())
    })?;

    let planner =
        Planner::with_gateway(state.gateway.clone()).with_max_steps(request.max_steps);
    let graph = planner
        .plan(request.goal.trim(), &state.registry)
        .await
        .map_err(map_plan_error)?;

    let mut opts = ExecuteOptions::new();
    if let Some(max_concurrency) = request.max_concurrency {
        opts = opts.with_max_concurrency(max_concurrency);
    }
    let report = state.executor.execute(graph, opts).await;

    let nodes = report
        .graph
        .nodes
        .iter()
        .map(|node| NodeView {
            id: node.id.clone(),
            status: node.status,
            output: node.result.as_ref().map(|r| r.output().to_string()),
        })
        .collect();

    Ok(Json(RunResponse {
        run_id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        success: report.success,
        duration_ms: report.duration.as_millis() as u64,
        synthesizer_prompt: report.graph.synthesizer_prompt.clone(),
        nodes,
    }))
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: String,
) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            message,
        }),
    )
}

fn map_plan_error(err: PlanError) -> (StatusCode, Json<ErrorBody>) {
    let (status, code) = match &err {
        PlanError::ParseFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "plan_parse_failed"),
        PlanError::ValidationFailed(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "plan_validation_failed")
        }
        PlanError::Graph(_) => (StatusCode::UNPROCESSABLE_ENTITY, "graph_invalid"),
        PlanError::Gateway(_) => (StatusCode::BAD_GATEWAY, "gateway_error"),
        PlanError::AgentExecution(_) => (StatusCode::BAD_GATEWAY, "agent_execution_failed"),
        PlanError::ConfigMissing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_missing"),
    };
    error_response(status, code, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::gateway::GatewayError;
    use conductor_gateway::MockGateway;
    use serde_json::json;

    const PLAN_JSON: &str = r#"{"nodes":[
        {"id":"s1","task":"collect data"},
        {"id":"s2","task":"summarize","dependsOn":["s1"]}
    ]}"#;

    fn state_with(gateway: MockGateway) -> AppState {
        build_state(&ConductorConfig::default(), Arc::new(gateway)).expect("state")
    }

    #[test]
    fn test_submit_runs_plan_to_completion() {
        tokio_test::block_on(async {
            let state = state_with(MockGateway::new(PLAN_JSON));
            let response = submit_goal(
                State(state),
                Json(json!({"goal": "write a report", "maxConcurrency": 2})),
            )
            .await
            .expect("run response");

            assert!(response.0.success);
            assert_eq!(response.0.nodes.len(), 2);
            assert!(response.0.nodes.iter().all(|n| n.status == TaskStatus::Done));
        });
    }

    #[test]
    fn test_submit_rejects_invalid_payload() {
        tokio_test::block_on(async {
            let state = state_with(MockGateway::new(PLAN_JSON));
            let (status, body) = submit_goal(State(state), Json(json!({"goal": "  "})))
                .await
                .expect_err("invalid payload");
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body.0.code, "invalid_submission");
        });
    }

    #[test]
    fn test_submit_maps_parse_failure_to_422() {
        tokio_test::block_on(async {
            let state = state_with(MockGateway::new("not json at all"));
            let (status, body) = submit_goal(State(state), Json(json!({"goal": "report"})))
                .await
                .expect_err("parse failure");
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body.0.code, "plan_parse_failed");
        });
    }

    #[test]
    fn test_submit_maps_gateway_failure_to_502() {
        tokio_test::block_on(async {
            let state = state_with(MockGateway::failing(GatewayError::ConnectionFailed));
            let (status, body) = submit_goal(State(state), Json(json!({"goal": "report"})))
                .await
                .expect_err("gateway failure");
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(body.0.code, "gateway_error");
        });
    }

    #[test]
    fn test_submit_enforces_max_steps() {
        tokio_test::block_on(async {
            let state = state_with(MockGateway::new(PLAN_JSON));
            let (status, body) = submit_goal(
                State(state),
                Json(json!({"goal": "report", "maxSteps": 1})),
            )
            .await
            .expect_err("cap exceeded");
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body.0.code, "plan_validation_failed");
        });
    }
}
