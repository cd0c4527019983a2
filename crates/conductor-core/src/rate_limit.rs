//! Per-agent rate limiting
//!
//! A sliding-window gate keyed by agent name. `acquire` suspends the caller
//! until the agent's quota permits another call. Waiters for the same agent
//! queue on one tokio mutex, which wakes them in FIFO order; different agent
//! keys never block each other.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::time::sleep;

/// Per-agent sliding-window throttle.
pub struct AgentRateLimiter {
    enabled: bool,
    requests_per_interval: u32,
    interval: Duration,
    grants: RwLock<HashMap<String, Arc<Mutex<VecDeque<Instant>>>>>,
}

impl AgentRateLimiter {
    /// Create a limiter allowing `requests_per_interval` calls per `interval`
    pub fn new(enabled: bool, requests_per_interval: u32, interval: Duration) -> Self {
        Self {
            enabled,
            requests_per_interval,
            interval,
            grants: RwLock::new(HashMap::new()),
        }
    }

    /// A limiter that admits every call immediately
    pub fn disabled() -> Self {
        Self::new(false, 0, Duration::ZERO)
    }

    /// Whether the executor should acquire before dispatch
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Suspend until the agent's quota permits another call, then consume one
    /// unit. FIFO per agent; no fairness promise across agents.
    pub async fn acquire(&self, agent_name: &str) {
        if !self.enabled || self.requests_per_interval == 0 || self.interval.is_zero() {
            return;
        }

        let state = self.state_for(agent_name).await;
        // held across the wait: serializes acquirers for this agent
        let mut grants = state.lock().await;

        loop {
            let now = Instant::now();
            while let Some(front) = grants.front() {
                if now.duration_since(*front) >= self.interval {
                    grants.pop_front();
                } else {
                    break;
                }
            }

            if grants.len() < self.requests_per_interval as usize {
                grants.push_back(now);
                return;
            }

            let oldest = match grants.front() {
                Some(instant) => *instant,
                None => {
                    grants.push_back(now);
                    return;
                }
            };
            let wait = self.interval.saturating_sub(now.duration_since(oldest));
            tracing::debug!(
                agent = %agent_name,
                wait_ms = wait.as_millis() as u64,
                "rate limit reached; waiting for window"
            );
            sleep(wait).await;
        }
    }

    async fn state_for(&self, agent_name: &str) -> Arc<Mutex<VecDeque<Instant>>> {
        {
            let grants = self.grants.read().await;
            if let Some(state) = grants.get(agent_name) {
                return state.clone();
            }
        }
        let mut grants = self.grants.write().await;
        grants
            .entry(agent_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }
}
