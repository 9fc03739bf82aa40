//! Service configuration

use crate::rate_limit::RateLimitConfig;
use meridian_connection::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level knobs for one service instance
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Reconnect behaviour for the terminal session
    pub retry: RetryPolicy,
    /// How long a symbol catalog snapshot stays fresh
    pub catalog_ttl: Duration,
    /// Per-caller request budget; applies to remote callers only
    pub rate: RateLimitConfig,
    /// Directory for chart artifacts
    pub artifact_dir: PathBuf,
    /// Script source length ceiling
    pub max_script_len: usize,
    /// Include internal detail in error responses
    pub verbose_diagnostics: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            catalog_ttl: Duration::from_secs(30),
            rate: RateLimitConfig {
                budget: 120,
                window: Duration::from_secs(60),
            },
            artifact_dir: std::env::temp_dir().join("meridian-artifacts"),
            max_script_len: 10_000,
            verbose_diagnostics: false,
        }
    }
}
