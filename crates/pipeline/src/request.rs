//! Pipeline request shape

use meridian_gateway::StructuredRequest;
use meridian_ports::ChartSpec;
use serde::Deserialize;

/// One analysis run: a single data query plus the derived steps to fan out
/// over the fetched frame.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRequest {
    /// The one market-data fetch; must resolve to a tabular operation
    pub query: StructuredRequest,

    #[serde(default)]
    pub indicators: Vec<IndicatorStep>,

    #[serde(default)]
    pub chart: Option<ChartSpec>,

    #[serde(default)]
    pub forecast: Option<ForecastRequest>,

    /// Fail the whole run on the first step failure instead of reporting
    /// partial results
    #[serde(default)]
    pub all_or_nothing: bool,

    /// Trim the reported frame and computed columns to the last N rows;
    /// derived steps still see the full fetch
    #[serde(default)]
    pub tail: Option<usize>,
}

/// One indicator application
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorStep {
    /// Indicator name, e.g. "rsi", "ta.rsi" or "momentum.rsi"
    pub function: String,

    /// Output column name; the indicator's default (e.g. "rsi_14") when
    /// absent
    #[serde(default)]
    pub column: Option<String>,

    #[serde(default)]
    pub window: Option<usize>,
}

/// Forecast (and optional classification) over the fetched close series
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastRequest {
    #[serde(default)]
    pub horizon: Option<usize>,

    #[serde(default)]
    pub interval: Option<f64>,

    /// Also run the directional classifier
    #[serde(default)]
    pub classify: bool,

    /// Return lookback for the classifier's features
    #[serde(default)]
    pub lookback: Option<usize>,
}
