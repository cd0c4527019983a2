//! Executor module
//!
//! The Executor is responsible for:
//! - Ready-set scheduling over the task graph with bounded parallelism
//! - Per-node dispatch: agent resolution, cache probe, rate limit, retry
//! - Failure propagation to unreachable descendants
//! - Cancellation between batches
//!
//! It exclusively owns the graph for the duration of one `execute` call;
//! all graph mutation happens in the coordinating context after a
//! dispatched batch settles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::agent::{AgentError, AgentRegistry};
use crate::cache::{task_key, TaskCache};
use crate::rate_limit::AgentRateLimiter;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{TaskGraph, TaskNode, TaskResult};
use crate::util::truncate_for_log;

// Re-export for callers wiring cancellation
pub use tokio_util::sync::CancellationToken;

const MAX_LOG_TEXT_CHARS: usize = 2_000;
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Lifecycle callbacks observed during a run.
///
/// `on_node_start` is observed strictly before `on_node_end` for the same
/// node; both fire exactly once per dispatched node.
#[async_trait]
pub trait ExecutionHooks: Send + Sync {
    async fn on_node_start(&self, _node_id: &str) {}
    async fn on_node_end(&self, _node_id: &str, _result: &TaskResult) {}
}

/// Per-run options.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Batch size override; defaults to the executor's configured value
    pub max_concurrency: Option<usize>,
    /// Cancellation signal, checked between batches
    pub cancel: Option<CancellationToken>,
    /// Lifecycle callbacks
    pub hooks: Option<Arc<dyn ExecutionHooks>>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ExecutionHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// Outcome of one `execute` call.
#[derive(Debug)]
pub struct ExecutionReport {
    /// The graph after mutation; every node is terminal unless the run
    /// exited early (deadlock branch)
    pub graph: TaskGraph,
    /// True iff every node is done
    pub success: bool,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Terminal results by node id; skipped nodes have no result
    pub node_results: HashMap<String, TaskResult>,
}

/// The executor - drives a TaskGraph to a terminal state.
pub struct Executor {
    registry: Arc<AgentRegistry>,
    cache: Arc<TaskCache>,
    rate_limiter: Arc<AgentRateLimiter>,
    max_concurrency: usize,
    retry_policy: RetryPolicy,
}

impl Executor {
    /// Create an executor over shared registry, cache, and rate limiter
    pub fn new(
        registry: Arc<AgentRegistry>,
        cache: Arc<TaskCache>,
        rate_limiter: Arc<AgentRateLimiter>,
    ) -> Self {
        Self {
            registry,
            cache,
            rate_limiter,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Set the default parallel batch size
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Set the backoff schedule used when nodes request retries
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Drive the graph until every node is terminal.
    ///
    /// The caller hands over the graph and receives it back in the report.
    pub async fn execute(&self, mut graph: TaskGraph, opts: ExecuteOptions) -> ExecutionReport {
        let started = Instant::now();
        let max_concurrency = opts
            .max_concurrency
            .unwrap_or(self.max_concurrency)
            .max(1);
        let cancel = opts.cancel.clone().unwrap_or_default();
        let hooks = opts.hooks.clone();

        loop {
            if cancel.is_cancelled() {
                tracing::info!(goal = %graph.goal, "run cancelled; skipping pending nodes");
                graph.skip_pending();
                break;
            }
            if graph.is_complete() {
                break;
            }

            let batch: Vec<TaskNode> = graph
                .ready_nodes()
                .into_iter()
                .take(max_concurrency)
                .cloned()
                .collect();

            if batch.is_empty() {
                let pending = graph
                    .nodes
                    .iter()
                    .filter(|n| !n.status.is_terminal())
                    .count();
                tracing::error!(
                    goal = %graph.goal,
                    pending,
                    "no ready nodes but graph is not complete; aborting run"
                );
                break;
            }

            let mut in_flight = FuturesUnordered::new();
            for node in batch {
                graph.mark_running(&node.id);
                if let Some(hooks) = &hooks {
                    hooks.on_node_start(&node.id).await;
                }
                tracing::info!(node_id = %node.id, "node execution started");
                in_flight.push(async move {
                    let outcome = self.execute_node(&node).await;
                    (node, outcome)
                });
            }

            while let Some((node, outcome)) = in_flight.next().await {
                let result = match outcome {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::error!(
                            node_id = %node.id,
                            error = %truncate_for_log(&err.to_string(), MAX_LOG_TEXT_CHARS),
                            "agent raised unexpectedly"
                        );
                        TaskResult::error(err.to_string())
                    }
                };

                match &result {
                    TaskResult::Ok(_) => {
                        tracing::info!(node_id = %node.id, "node execution completed");
                        graph.mark_done(&node.id, result.clone());
                    }
                    TaskResult::Error(output) => {
                        tracing::error!(
                            node_id = %node.id,
                            error = %truncate_for_log(output, MAX_LOG_TEXT_CHARS),
                            "node execution failed"
                        );
                        graph.mark_failed(&node.id, result.clone());
                        graph.skip_downstream(&node.id);
                    }
                }

                if let Some(hooks) = &hooks {
                    hooks.on_node_end(&node.id, &result).await;
                }
            }
        }

        let node_results: HashMap<String, TaskResult> = graph
            .nodes
            .iter()
            .filter_map(|n| n.result.clone().map(|r| (n.id.clone(), r)))
            .collect();
        let success = graph.all_done();
        ExecutionReport {
            graph,
            success,
            duration: started.elapsed(),
            node_results,
        }
    }

    /// Execute one node end to end: resolve agent, probe cache, acquire the
    /// rate limiter, invoke the agent (retry-wrapped when configured), and
    /// store successful output back into the cache.
    async fn execute_node(&self, node: &TaskNode) -> Result<TaskResult, AgentError> {
        let agent = match &node.assign_to {
            Some(selector) => self.registry.pick(selector),
            None => self.registry.first(),
        };
        let Some(agent) = agent else {
            return Ok(TaskResult::error(format!(
                "No agent available for node '{}'",
                node.id
            )));
        };

        let cache_key = task_key(&node.task, agent.name());
        if self.cache.is_enabled() {
            if let Some(hit) = self.cache.get(&cache_key).await {
                tracing::debug!(node_id = %node.id, agent = %agent.name(), "task cache hit");
                return Ok(TaskResult::ok(hit));
            }
        }

        if self.rate_limiter.is_enabled() {
            self.rate_limiter.acquire(agent.name()).await;
        }

        let result = if node.config.retries > 0 {
            let policy = self
                .retry_policy
                .with_max_attempts(node.config.retries + 1);
            retry_with_backoff(policy, || agent.execute(node)).await?
        } else {
            agent.execute(node).await?
        };

        if self.cache.is_enabled() {
            if let TaskResult::Ok(output) = &result {
                self.cache.set(cache_key, output.clone()).await;
            }
        }

        Ok(result)
    }
}
