//! Response envelopes
//!
//! Every entry point returns either a success envelope or an
//! [`ErrorResponse`]. Errors are structured for a tool-calling agent: a
//! stable `error_type`, a human-readable message, and where possible a
//! concrete suggestion or example the agent can act on in its next attempt.

use meridian_core::Frame;
use meridian_executor::{ExecError, ScriptOutcome};
use meridian_gateway::{GatewayError, Invocation};
use meridian_pipeline::{PipelineError, PipelineReport, StepFailure};
use meridian_ports::{Forecast, Signal};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::rate_limit::RateLimited;

/// Structured failure envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable kind, e.g. "SYMBOL_NOT_FOUND"
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// A request shape known to work, when one helps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    /// Internal failure detail, present only when verbose diagnostics are on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    fn new(error: String, error_type: &str) -> Self {
        Self {
            error,
            error_type: error_type.to_string(),
            suggestion: None,
            example: None,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }

    fn example_for(kind: &str) -> Option<String> {
        match kind {
            "UNKNOWN_OPERATION" | "MISSING_PARAMETER" => Some(
                r#"{"operation": "copy_rates_from_pos", "symbol": "EURUSD", "parameters": {"timeframe": "H1", "count": 100}}"#
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl From<GatewayError> for ErrorResponse {
    fn from(error: GatewayError) -> Self {
        let kind = error.kind();
        Self {
            suggestion: error.suggestion(),
            example: Self::example_for(kind),
            ..Self::new(error.to_string(), kind)
        }
    }
}

impl From<ExecError> for ErrorResponse {
    fn from(error: ExecError) -> Self {
        let kind = error.kind();
        Self {
            suggestion: error.suggestion(),
            example: Self::example_for(kind),
            ..Self::new(error.to_string(), kind)
        }
    }
}

impl From<PipelineError> for ErrorResponse {
    fn from(error: PipelineError) -> Self {
        let kind = error.kind();
        Self {
            suggestion: error.suggestion(),
            example: Self::example_for(kind),
            ..Self::new(error.to_string(), kind)
        }
    }
}

impl From<RateLimited> for ErrorResponse {
    fn from(error: RateLimited) -> Self {
        let mut response = Self::new(error.to_string(), "RATE_LIMITED");
        response.suggestion = Some("Back off and retry after the window resets".to_string());
        response
    }
}

/// Successful structured query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub operation: String,
    pub success: bool,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<String>,
}

impl From<Invocation> for QueryResponse {
    fn from(invocation: Invocation) -> Self {
        Self {
            operation: invocation.operation.to_string(),
            success: true,
            data: serde_json::to_value(&invocation.output).unwrap_or(json!(null)),
            corrections: invocation.corrections,
        }
    }
}

/// Successful script run
#[derive(Debug, Clone, Serialize)]
pub struct ScriptResponse {
    pub success: bool,
    pub result: serde_json::Value,
    /// Names the script bound, in binding order
    pub bindings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<String>,
}

impl From<ScriptOutcome> for ScriptResponse {
    fn from(outcome: ScriptOutcome) -> Self {
        Self {
            success: true,
            result: outcome.result.to_json(),
            bindings: outcome.bindings,
            corrections: outcome.corrections,
        }
    }
}

/// Successful pipeline run; partial failures ride along in `failures`
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub operation: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub rows: usize,
    pub frame: Frame,
    pub computed: BTreeMap<String, Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Forecast>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<Signal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StepFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<String>,
}

impl From<PipelineReport> for AnalysisResponse {
    fn from(report: PipelineReport) -> Self {
        Self {
            operation: report.operation,
            success: true,
            symbol: report.symbol,
            rows: report.frame.len(),
            frame: report.frame,
            computed: report.computed,
            forecast: report.forecast,
            signal: report.signal,
            artifacts: report.artifacts,
            failures: report.failures,
            corrections: report.corrections,
        }
    }
}
