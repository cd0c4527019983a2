//! # Conductor Core
//!
//! Core pipeline for the Conductor orchestrator.
//!
//! This crate contains:
//! - TaskNode / TaskGraph definitions with DAG validation
//! - Planner: goal -> LLM -> validated TaskGraph
//! - Executor: concurrent ready-set scheduling with bounded parallelism
//! - Task cache, per-agent rate limiter, and retry helper
//!
//! This crate does NOT care about:
//! - How goals are submitted (HTTP, CLI)
//! - Which transport backs the gateway
//! - Where configuration comes from

pub mod agent;
pub mod cache;
pub mod executor;
pub mod gateway;
pub mod planner;
pub mod rate_limit;
pub mod retry;
pub mod schema;
pub mod types;

mod util;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::{AgentAdapter, AgentError, AgentRegistry, RegistryError};
    pub use crate::cache::{task_key, TaskCache};
    pub use crate::executor::{
        CancellationToken, ExecuteOptions, ExecutionHooks, ExecutionReport, Executor,
    };
    pub use crate::gateway::{GatewayClient, GatewayError};
    pub use crate::planner::{PlanError, Planner};
    pub use crate::rate_limit::AgentRateLimiter;
    pub use crate::retry::{retry_with_backoff, RetryPolicy};
    pub use crate::schema::{validate_plan_response, validate_submission, SchemaError};
    pub use crate::types::{GraphError, NodeConfig, TaskGraph, TaskNode, TaskResult, TaskStatus};
}

// Re-export key types at crate root
pub use agent::{AgentAdapter, AgentError, AgentRegistry};
pub use executor::{ExecuteOptions, ExecutionHooks, ExecutionReport, Executor};
pub use gateway::{GatewayClient, GatewayError};
pub use planner::{PlanError, Planner};
pub use types::{TaskGraph, TaskNode, TaskResult, TaskStatus};
