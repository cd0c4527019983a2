//! Gateway client abstraction
//!
//! The planner talks to an external LLM endpoint through this trait; the
//! concrete transport lives in its own crate. Session keys scope one
//! conversation so planner calls are not conflated with other traffic.

use async_trait::async_trait;
use thiserror::Error;

/// Classified transport failures of the LLM channel.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway timeout: {0}")]
    Timeout(String),

    #[error("gateway connection failed: {0}")]
    ConnectionFailed(String),

    #[error("gateway protocol error: {0}")]
    Protocol(String),
}

/// One-shot chat call against an LLM endpoint.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Send `prompt` under the given session key and return the raw
    /// completion text.
    async fn chat(&self, prompt: &str, session_key: &str) -> Result<String, GatewayError>;
}

#[async_trait]
impl GatewayClient for std::sync::Arc<dyn GatewayClient> {
    async fn chat(&self, prompt: &str, session_key: &str) -> Result<String, GatewayError> {
        (**self).chat(prompt, session_key).await
    }
}
