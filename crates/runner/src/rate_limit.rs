//! Per-caller rate limiting
//!
//! Fixed-window counting per caller identity. A budget of zero disables the
//! limiter entirely, which is the right default for trusted local transports
//! where the caller and the operator are the same person.

use dashmap::DashMap;
use log::warn;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per window; 0 disables the limiter
    pub budget: u32,
    pub window: Duration,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded: {budget} requests per {}s window", window.as_secs())]
pub struct RateLimited {
    pub budget: u32,
    pub window: Duration,
}

/// Counts request timestamps per caller identity
pub struct RateLimiter {
    config: RateLimitConfig,
    hits: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: DashMap::new(),
        }
    }

    /// Admit or reject one request from `identity`
    pub fn check(&self, identity: &str) -> Result<(), RateLimited> {
        if self.config.budget == 0 {
            return Ok(());
        }
        let now = Instant::now();
        let mut entry = self.hits.entry(identity.to_string()).or_default();
        entry.retain(|at| now.duration_since(*at) < self.config.window);
        if entry.len() >= self.config.budget as usize {
            warn!("rate limit hit for caller '{identity}'");
            return Err(RateLimited {
                budget: self.config.budget,
                window: self.config.window,
            });
        }
        entry.push(now);
        Ok(())
    }
}
