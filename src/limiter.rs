// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client cooldown throttle.
//!
//! Each client key maps to the instant of its last accepted action. An
//! action is accepted only once strictly more than the configured interval
//! has elapsed since then; rejected actions leave the timestamp untouched. This spaces actions out,
//! it does not smooth bursts the way a token bucket would.
//!
//! Entries are evicted by [`Throttle::cleanup`] once their interval has
//! passed, which keeps the map bounded by the number of clients active
//! within one interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Result of a throttle check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Action is allowed
    Allowed,
    /// Action came too soon after the previous accepted one
    Limited {
        /// Time until the next action would be accepted
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Thread-safe cooldown throttle keyed by client.
#[derive(Clone)]
pub struct Throttle {
    /// Label used in logs
    name: &'static str,
    /// Minimum spacing between accepted actions
    interval: Duration,
    /// Last accepted action per client
    last_accepted: Arc<RwLock<HashMap<String, Instant>>>,
}

impl Throttle {
    /// Create a new throttle. A zero interval accepts everything.
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            last_accepted: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check and, if allowed, record an action for `client`.
    pub async fn check(&self, client: &str) -> RateLimitResult {
        if self.interval.is_zero() {
            return RateLimitResult::Allowed;
        }

        let now = Instant::now();
        let mut last = self.last_accepted.write().await;

        if let Some(&previous) = last.get(client) {
            let elapsed = now.duration_since(previous);
            if elapsed <= self.interval {
                let retry_after = (self.interval - elapsed).max(Duration::from_millis(1));
                debug!(throttle = self.name, %client, ?retry_after, "Action throttled");
                return RateLimitResult::Limited { retry_after };
            }
        }

        last.insert(client.to_string(), now);
        RateLimitResult::Allowed
    }

    /// Boolean form of [`Throttle::check`].
    pub async fn allow(&self, client: &str) -> bool {
        self.check(client).await.is_allowed()
    }

    /// Drop entries whose cooldown has fully elapsed (should be called periodically).
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut last = self.last_accepted.write().await;
        let before = last.len();
        last.retain(|_, at| now.duration_since(*at) <= self.interval);
        let removed = before - last.len();
        if removed > 0 {
            debug!(throttle = self.name, removed, remaining = last.len(), "Swept throttle entries");
        }
        removed
    }

    /// Number of clients currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.last_accepted.read().await.len()
    }
}
