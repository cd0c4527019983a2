//! # Conductor Gateway
//!
//! Concrete transport behind the core's `GatewayClient` trait:
//! - `HttpGatewayClient`: an OpenAI-compatible chat completions client that
//!   classifies transport failures into the gateway error taxonomy
//! - `GatewayAgent`: an agent adapter fronting the gateway, so executed
//!   nodes are answered by the same LLM channel the planner uses
//! - `MockGateway`: canned responses for tests and examples

mod agent;
mod http;
mod mock;

pub use agent::GatewayAgent;
pub use http::{HttpGatewayClient, HttpGatewayConfig};
pub use mock::MockGateway;
