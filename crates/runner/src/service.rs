//! The terminal service facade
//!
//! One struct owns the whole wired system and exposes the three entry
//! points: structured queries, sandboxed scripts and analysis pipelines.
//! Every entry point applies the same admission step: remote callers pass
//! through the rate limiter, local callers do not.

use crate::rate_limit::RateLimiter;
use crate::response::{AnalysisResponse, ErrorResponse, QueryResponse, ScriptResponse};
use log::info;
use meridian_connection::ConnectionManager;
use meridian_executor::SandboxExecutor;
use meridian_gateway::{OperationGateway, StructuredRequest};
use meridian_pipeline::{Pipeline, PipelineRequest};
use meridian_ports::Terminal;
use std::sync::Arc;

/// Where a request entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOrigin {
    /// Same-process or stdio transport; trusted, not rate limited
    Local,
    /// Network transport; rate limited per caller identity
    Remote,
}

/// Caller identity attached to every request
#[derive(Debug, Clone)]
pub struct CallerEnvelope {
    /// Stable identity the limiter counts against (e.g. client address)
    pub identity: String,
    pub origin: TransportOrigin,
}

impl CallerEnvelope {
    pub fn local() -> Self {
        Self {
            identity: "local".to_string(),
            origin: TransportOrigin::Local,
        }
    }

    pub fn remote(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            origin: TransportOrigin::Remote,
        }
    }
}

/// The fully wired read-only terminal service
pub struct TerminalService<T: Terminal> {
    manager: Arc<ConnectionManager<T>>,
    gateway: Arc<OperationGateway<T>>,
    executor: SandboxExecutor<T>,
    pipeline: Pipeline<T>,
    limiter: RateLimiter,
    verbose_diagnostics: bool,
}

impl<T: Terminal> TerminalService<T> {
    pub(crate) fn new(
        manager: Arc<ConnectionManager<T>>,
        gateway: Arc<OperationGateway<T>>,
        executor: SandboxExecutor<T>,
        pipeline: Pipeline<T>,
        limiter: RateLimiter,
        verbose_diagnostics: bool,
    ) -> Self {
        Self {
            manager,
            gateway,
            executor,
            pipeline,
            limiter,
            verbose_diagnostics,
        }
    }

    /// Run one structured operation
    pub async fn query(
        &self,
        caller: &CallerEnvelope,
        request: &StructuredRequest,
    ) -> Result<QueryResponse, ErrorResponse> {
        self.admit(caller)?;
        info!("query '{}' from {}", request.operation, caller.identity);
        let invocation = self
            .gateway
            .invoke(request)
            .await
            .map_err(|e| self.shape(e))?;
        Ok(QueryResponse::from(invocation))
    }

    /// Run one sandboxed script
    pub async fn execute_script(
        &self,
        caller: &CallerEnvelope,
        source: &str,
    ) -> Result<ScriptResponse, ErrorResponse> {
        self.admit(caller)?;
        info!(
            "script ({} chars) from {}",
            source.len(),
            caller.identity
        );
        let outcome = self.executor.eval(source).await.map_err(|e| self.shape(e))?;
        Ok(ScriptResponse::from(outcome))
    }

    /// Run one analysis pipeline
    pub async fn analyze(
        &self,
        caller: &CallerEnvelope,
        request: &PipelineRequest,
    ) -> Result<AnalysisResponse, ErrorResponse> {
        self.admit(caller)?;
        info!(
            "pipeline '{}' from {}",
            request.query.operation, caller.identity
        );
        let report = self.pipeline.run(request).await.map_err(|e| self.shape(e))?;
        Ok(AnalysisResponse::from(report))
    }

    /// Close the terminal session
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }

    fn admit(&self, caller: &CallerEnvelope) -> Result<(), ErrorResponse> {
        match caller.origin {
            TransportOrigin::Local => Ok(()),
            TransportOrigin::Remote => self
                .limiter
                .check(&caller.identity)
                .map_err(|e| self.shape(e)),
        }
    }

    /// Shape a layer error into the response envelope, attaching internal
    /// detail when verbose diagnostics are enabled
    fn shape<E>(&self, error: E) -> ErrorResponse
    where
        E: std::fmt::Debug + Into<ErrorResponse>,
    {
        if self.verbose_diagnostics {
            let detail = format!("{error:?}");
            error.into().with_detail(detail)
        } else {
            error.into()
        }
    }
}
