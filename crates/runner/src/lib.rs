//! Meridian Runner - Read-Only Terminal Service
//!
//! Wires the whole system together and fronts it with three entry points:
//!
//! - **query**: one validated operation against the capability registry
//! - **execute_script**: a sandboxed multi-step script
//! - **analyze**: an indicator/forecast/chart pipeline over a single fetch
//!
//! ## Architecture
//!
//! ```text
//!   agent request (query | script | pipeline)
//!                    │
//!                    ▼
//!         ┌───────────────────────┐
//!         │    TerminalService    │  rate limit (remote callers)
//!         └───────────┬───────────┘
//!             ┌───────┴────────┐
//!             ▼                ▼
//!   ┌──────────────────┐  ┌──────────────────┐
//!   │ SandboxExecutor  │  │     Pipeline     │──► analytics
//!   └────────┬─────────┘  └────────┬─────────┘    (indicators,
//!            │ calls               │ one fetch     forecast, chart)
//!            └─────────┬──────────┘
//!                      ▼
//!          ┌───────────────────────┐
//!          │   OperationGateway    │  registry + symbol catalog
//!          └───────────┬───────────┘
//!                      ▼
//!          ┌───────────────────────┐
//!          │  ConnectionManager    │  one guarded call at a time
//!          └───────────┬───────────┘
//!                      ▼
//!                  Terminal
//! ```

pub mod bootstrap;
pub mod config;
pub mod rate_limit;
pub mod response;
pub mod service;

pub use bootstrap::Bootstrap;
pub use config::ServiceConfig;
pub use rate_limit::{RateLimitConfig, RateLimited, RateLimiter};
pub use response::{AnalysisResponse, ErrorResponse, QueryResponse, ScriptResponse};
pub use service::{CallerEnvelope, TerminalService, TransportOrigin};
