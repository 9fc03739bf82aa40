//! Pipeline run context and report

use meridian_core::Frame;
use meridian_ports::{Forecast, Signal};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One recoverable step failure, reported alongside partial results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    /// Step label, e.g. "indicator:rsi" or "chart"
    pub step: String,
    pub message: String,
}

/// Everything a pipeline run produced.
///
/// `frame` and `computed` are already trimmed to the request's `tail`;
/// derived steps ran over the full fetch.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub operation: String,
    pub symbol: Option<String>,
    pub frame: Frame,
    /// Indicator columns keyed by output name, aligned with `frame`
    pub computed: BTreeMap<String, Vec<f64>>,
    pub forecast: Option<Forecast>,
    pub signal: Option<Signal>,
    /// Files written by the chart step
    pub artifacts: Vec<PathBuf>,
    /// Steps that failed when partial results are allowed
    pub failures: Vec<StepFailure>,
    /// Corrections the gateway applied to the query
    pub corrections: Vec<String>,
}

impl PipelineReport {
    /// Whether every requested step completed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
