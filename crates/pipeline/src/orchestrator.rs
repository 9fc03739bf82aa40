//! Pipeline orchestration
//!
//! A run performs exactly one gateway fetch; indicators, the forecast, the
//! classifier and the chart artifact all read from that single frame. Step
//! failures are accumulated and reported with the partial results unless the
//! request asks for all-or-nothing, in which case the first failure aborts
//! the run.

use crate::context::{PipelineReport, StepFailure};
use crate::error::{PipelineError, PipelineResult};
use crate::features::lookback_returns;
use crate::request::{ForecastRequest, IndicatorStep, PipelineRequest};
use log::{debug, warn};
use meridian_core::Frame;
use meridian_gateway::{OperationGateway, OperationOutput, ResultShape};
use meridian_ports::{
    ArtifactRenderer, Classifier, ComputeError, Forecast, ForecastSpec, Forecaster,
    IndicatorParams, IndicatorSet, Signal, Terminal,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_CLASSIFIER_LOOKBACK: usize = 16;

/// Fans one fetched frame out to the analytics collaborators
pub struct Pipeline<T: Terminal> {
    gateway: Arc<OperationGateway<T>>,
    indicators: IndicatorSet,
    forecaster: Arc<dyn Forecaster>,
    classifier: Arc<dyn Classifier>,
    renderer: Arc<dyn ArtifactRenderer>,
    artifact_dir: PathBuf,
}

impl<T: Terminal> Pipeline<T> {
    pub fn new(
        gateway: Arc<OperationGateway<T>>,
        indicators: IndicatorSet,
        forecaster: Arc<dyn Forecaster>,
        classifier: Arc<dyn Classifier>,
        renderer: Arc<dyn ArtifactRenderer>,
        artifact_dir: PathBuf,
    ) -> Self {
        Self {
            gateway,
            indicators,
            forecaster,
            classifier,
            renderer,
            artifact_dir,
        }
    }

    pub async fn run(&self, request: &PipelineRequest) -> PipelineResult<PipelineReport> {
        // Scalar and record queries can be rejected from the schema alone,
        // before any fetch is spent on them
        if let Some(spec) = self.gateway.registry().resolve(&request.query.operation) {
            if spec.shape != ResultShape::Table {
                return Err(PipelineError::NotTabular {
                    operation: request.query.operation.clone(),
                });
            }
        }

        // The one and only fetch. A failure here is always fatal; there is
        // nothing to report partially.
        let invocation = self.gateway.invoke(&request.query).await?;
        let frame = match invocation.output {
            OperationOutput::Bars(frame) => frame,
            _ => {
                return Err(PipelineError::NotTabular {
                    operation: invocation.operation.to_string(),
                });
            }
        };
        debug!(
            "pipeline fetched {} bars via {}",
            frame.len(),
            invocation.operation
        );

        let mut computed: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut failures: Vec<StepFailure> = Vec::new();
        let close = frame.close_series();

        for step in &request.indicators {
            match self.run_indicator(step, &close) {
                Ok((column, series)) => {
                    computed.insert(column, series);
                }
                Err(e) => self.step_failed(request, &mut failures, e)?,
            }
        }

        let mut forecast: Option<Forecast> = None;
        let mut signal: Option<Signal> = None;
        if let Some(forecast_request) = &request.forecast {
            match self.run_forecast(forecast_request, &frame) {
                Ok(produced) => forecast = Some(produced),
                Err(e) => self.step_failed(request, &mut failures, e)?,
            }
            if forecast_request.classify {
                match self.run_classifier(forecast_request, &close) {
                    Ok(produced) => signal = Some(produced),
                    Err(e) => self.step_failed(request, &mut failures, e)?,
                }
            }
        }

        let mut artifacts = Vec::new();
        if let Some(chart) = &request.chart {
            match self
                .renderer
                .render(&frame, &computed, chart, &self.artifact_dir)
            {
                Ok(path) => artifacts.push(path),
                Err(e) => self.step_failed(
                    request,
                    &mut failures,
                    step_error("chart", e),
                )?,
            }
        }

        let (frame, computed) = apply_tail(frame, computed, request.tail);
        Ok(PipelineReport {
            operation: invocation.operation.to_string(),
            symbol: request.query.symbol.clone(),
            frame,
            computed,
            forecast,
            signal,
            artifacts,
            failures,
            corrections: invocation.corrections,
        })
    }

    fn run_indicator(
        &self,
        step: &IndicatorStep,
        close: &[f64],
    ) -> PipelineResult<(String, Vec<f64>)> {
        let label = format!("indicator:{}", step.function);
        let indicator = self.indicators.resolve(&step.function).ok_or_else(|| {
            PipelineError::Computation {
                step: label.clone(),
                message: format!(
                    "unknown indicator '{}' (available: {})",
                    step.function,
                    self.indicators.ids().join(", ")
                ),
            }
        })?;
        let params = IndicatorParams {
            window: step.window,
        };
        let series = indicator
            .compute(close, &params)
            .map_err(|e| step_error(&label, e))?;
        let column = step
            .column
            .clone()
            .unwrap_or_else(|| indicator.default_column(&params));
        Ok((column, series))
    }

    fn run_forecast(
        &self,
        request: &ForecastRequest,
        frame: &Frame,
    ) -> PipelineResult<Forecast> {
        let defaults = ForecastSpec::default();
        let spec = ForecastSpec {
            horizon: request.horizon.unwrap_or(defaults.horizon),
            interval: request.interval.unwrap_or(defaults.interval),
        };
        self.forecaster
            .forecast(frame, &spec)
            .map_err(|e| step_error("forecast", e))
    }

    fn run_classifier(
        &self,
        request: &ForecastRequest,
        close: &[f64],
    ) -> PipelineResult<Signal> {
        let lookback = request.lookback.unwrap_or(DEFAULT_CLASSIFIER_LOOKBACK);
        let features =
            lookback_returns(close, lookback).map_err(|e| step_error("classify", e))?;
        self.classifier
            .classify(&features)
            .map_err(|e| step_error("classify", e))
    }

    /// Record a step failure, or abort the run when partial results are not
    /// acceptable
    fn step_failed(
        &self,
        request: &PipelineRequest,
        failures: &mut Vec<StepFailure>,
        error: PipelineError,
    ) -> PipelineResult<()> {
        if request.all_or_nothing {
            return Err(error);
        }
        let step = match &error {
            PipelineError::InsufficientData { step, .. } => step.clone(),
            PipelineError::Computation { step, .. } => step.clone(),
            _ => "query".to_string(),
        };
        warn!("pipeline step '{step}' failed: {error}");
        failures.push(StepFailure {
            step,
            message: error.to_string(),
        });
        Ok(())
    }
}

fn step_error(step: &str, error: ComputeError) -> PipelineError {
    match error {
        ComputeError::InsufficientData {
            required,
            available,
        } => PipelineError::InsufficientData {
            step: step.to_string(),
            required,
            available,
        },
        other => PipelineError::Computation {
            step: step.to_string(),
            message: other.to_string(),
        },
    }
}

/// Trim the reported rows; computed columns stay aligned with the frame
fn apply_tail(
    frame: Frame,
    computed: BTreeMap<String, Vec<f64>>,
    tail: Option<usize>,
) -> (Frame, BTreeMap<String, Vec<f64>>) {
    let Some(n) = tail else {
        return (frame, computed);
    };
    let trimmed = Frame::new(frame.tail(n).to_vec());
    let computed = computed
        .into_iter()
        .map(|(name, series)| {
            let start = series.len().saturating_sub(n);
            (name, series[start..].to_vec())
        })
        .collect();
    (trimmed, computed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_analytics::{
        CsvChartRenderer, DriftForecaster, MomentumClassifier, standard_indicators,
    };
    use meridian_connection::{ConnectionManager, RetryPolicy};
    use meridian_gateway::{Registry, StructuredRequest, SymbolCatalog};
    use meridian_ports::ChartSpec;
    use meridian_terminal_sim::SimTerminal;
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn pipeline() -> (Arc<SimTerminal>, Pipeline<SimTerminal>, PathBuf) {
        let _ = env_logger::try_init();
        let terminal = Arc::new(SimTerminal::with_defaults());
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&terminal),
            RetryPolicy {
                attempts: 2,
                delay: Duration::from_millis(1),
            },
        ));
        let catalog = Arc::new(SymbolCatalog::new(
            Arc::clone(&manager),
            Duration::from_secs(30),
        ));
        let gateway = Arc::new(OperationGateway::new(
            Registry::standard(),
            catalog,
            manager,
        ));
        let dir = std::env::temp_dir().join(format!("meridian-pipeline-{}", Uuid::new_v4()));
        let pipeline = Pipeline::new(
            gateway,
            standard_indicators(),
            Arc::new(DriftForecaster),
            Arc::new(MomentumClassifier),
            Arc::new(CsvChartRenderer),
            dir.clone(),
        );
        (terminal, pipeline, dir)
    }

    fn bars_query(count: u32) -> StructuredRequest {
        StructuredRequest::new("copy_rates_from_pos")
            .with_symbol("EURUSD")
            .with_param("timeframe", json!("H1"))
            .with_param("count", json!(count))
    }

    fn base_request(count: u32) -> PipelineRequest {
        PipelineRequest {
            query: bars_query(count),
            indicators: Vec::new(),
            chart: None,
            forecast: None,
            all_or_nothing: false,
            tail: None,
        }
    }

    #[tokio::test]
    async fn full_run_fetches_exactly_once() {
        let (terminal, pipeline, dir) = pipeline();
        let mut request = base_request(200);
        request.indicators = vec![
            IndicatorStep {
                function: "rsi".to_string(),
                column: None,
                window: Some(14),
            },
            IndicatorStep {
                function: "sma".to_string(),
                column: Some("slow".to_string()),
                window: Some(50),
            },
            IndicatorStep {
                function: "macd".to_string(),
                column: None,
                window: None,
            },
        ];
        request.forecast = Some(ForecastRequest {
            horizon: Some(12),
            interval: None,
            classify: true,
            lookback: None,
        });
        request.chart = Some(ChartSpec {
            columns: vec!["close".to_string(), "rsi_14".to_string()],
            filename: None,
            title: None,
        });

        let report = pipeline.run(&request).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.frame.len(), 200);
        assert!(report.computed.contains_key("rsi_14"));
        assert!(report.computed.contains_key("slow"));
        assert!(report.computed.contains_key("macd"));
        assert_eq!(report.forecast.as_ref().unwrap().points.len(), 12);
        assert!(report.signal.is_some());
        assert_eq!(report.artifacts.len(), 1);
        // One terminal bar fetch for the whole run
        assert_eq!(terminal.counters().bars, 1);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn short_fetch_reports_partial_results() {
        let (_, pipeline, _) = pipeline();
        let mut request = base_request(30);
        request.indicators = vec![
            IndicatorStep {
                function: "sma".to_string(),
                column: None,
                window: Some(10),
            },
            IndicatorStep {
                function: "sma".to_string(),
                column: Some("sma_50".to_string()),
                window: Some(50),
            },
        ];

        let report = pipeline.run(&request).await.unwrap();
        assert!(report.computed.contains_key("sma_10"));
        assert!(!report.computed.contains_key("sma_50"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].step.contains("sma"));
        assert!(report.failures[0].message.contains("55"));
    }

    #[tokio::test]
    async fn all_or_nothing_aborts_on_first_failure() {
        let (_, pipeline, _) = pipeline();
        let mut request = base_request(30);
        request.all_or_nothing = true;
        request.indicators = vec![IndicatorStep {
            function: "sma".to_string(),
            column: None,
            window: Some(50),
        }];

        let err = pipeline.run(&request).await.unwrap_err();
        match err {
            PipelineError::InsufficientData {
                required,
                available,
                ..
            } => {
                assert_eq!(required, 55);
                assert_eq!(available, 30);
            }
            other => panic!("expected insufficient data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_indicator_lists_the_catalog() {
        let (_, pipeline, _) = pipeline();
        let mut request = base_request(50);
        request.indicators = vec![IndicatorStep {
            function: "vwap".to_string(),
            column: None,
            window: None,
        }];

        let report = pipeline.run(&request).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].message.contains("momentum.rsi"));
    }

    #[tokio::test]
    async fn non_tabular_query_is_rejected_before_any_fetch() {
        let (terminal, pipeline, _) = pipeline();
        let request = PipelineRequest {
            query: StructuredRequest::new("account_info"),
            indicators: Vec::new(),
            chart: None,
            forecast: None,
            all_or_nothing: false,
            tail: None,
        };
        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotTabular { .. }));
        assert_eq!(terminal.counters().connects, 0);
    }

    #[tokio::test]
    async fn tail_trims_frame_and_columns_together() {
        let (_, pipeline, _) = pipeline();
        let mut request = base_request(100);
        request.tail = Some(10);
        request.indicators = vec![IndicatorStep {
            function: "rsi".to_string(),
            column: None,
            window: Some(14),
        }];

        let report = pipeline.run(&request).await.unwrap();
        assert_eq!(report.frame.len(), 10);
        assert_eq!(report.computed["rsi_14"].len(), 10);
        // Tail rows are past the warmup, so values are real
        assert!(report.computed["rsi_14"].iter().all(|v| v.is_finite()));
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal() {
        let (_, pipeline, _) = pipeline();
        let mut request = base_request(50);
        request.query.symbol = Some("EURUSX".to_string());
        let err = pipeline.run(&request).await.unwrap_err();
        assert_eq!(err.kind(), "SYMBOL_NOT_FOUND");
    }
}
