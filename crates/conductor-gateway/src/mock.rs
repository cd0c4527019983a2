//! Mock gateway for tests and examples.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use conductor_core::gateway::{GatewayClient, GatewayError};

/// Gateway client returning a canned response and recording calls.
pub struct MockGateway {
    response: String,
    failure: Option<fn(String) -> GatewayError>,
    calls: AtomicUsize,
    session_keys: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            failure: None,
            calls: AtomicUsize::new(0),
            session_keys: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always fails with the given classification
    pub fn failing(failure: fn(String) -> GatewayError) -> Self {
        Self {
            response: String::new(),
            failure: Some(failure),
            calls: AtomicUsize::new(0),
            session_keys: Mutex::new(Vec::new()),
        }
    }

    /// Total chat calls observed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Session keys in call order
    pub fn session_keys(&self) -> Vec<String> {
        self.session_keys.lock().expect("session keys lock").clone()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn chat(&self, _prompt: &str, session_key: &str) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.session_keys
            .lock()
            .expect("session keys lock")
            .push(session_key.to_string());
        match self.failure {
            Some(make) => Err(make("mock failure".to_string())),
            None => Ok(self.response.clone()),
        }
    }
}
