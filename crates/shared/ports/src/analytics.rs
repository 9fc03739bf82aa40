//! Collaborator ports for derived analytics
//!
//! Indicators, the forecaster and the classifier are pure functions over the
//! already-fetched series. The pipeline never re-queries on their behalf and
//! never retries them.

use crate::error::{ComputeError, ComputeResult};
use meridian_core::{Frame, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parameters accepted by every indicator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    /// Lookback window; indicators apply their own default when absent
    pub window: Option<usize>,
}

/// One technical indicator: `(close series, params) -> derived series`.
///
/// The output has the same length as the input; warmup positions are NaN.
pub trait Indicator: Send + Sync {
    /// Stable identifier, e.g. "momentum.rsi"
    fn id(&self) -> &'static str;

    /// Minimum bars needed for a meaningful output with these params
    fn min_bars(&self, params: &IndicatorParams) -> usize;

    /// Column name used when the caller does not provide one, e.g. "rsi_14"
    fn default_column(&self, params: &IndicatorParams) -> String;

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>>;
}

/// Fixed lookup table of indicators, built once at startup
#[derive(Default)]
pub struct IndicatorSet {
    by_id: BTreeMap<&'static str, Arc<dyn Indicator>>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, indicator: Arc<dyn Indicator>) {
        self.by_id.insert(indicator.id(), indicator);
    }

    /// Resolve by full id ("momentum.rsi"), with or without a leading "ta."
    /// prefix, or by bare function name ("rsi")
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Indicator>> {
        let name = name.strip_prefix("ta.").unwrap_or(name);
        if let Some(found) = self.by_id.get(name) {
            return Some(Arc::clone(found));
        }
        self.by_id
            .values()
            .find(|ind| ind.id().rsplit('.').next() == Some(name))
            .map(Arc::clone)
    }

    /// All registered ids, for "unknown indicator" suggestions
    pub fn ids(&self) -> Vec<&'static str> {
        self.by_id.keys().copied().collect()
    }
}

/// Forecast horizon and interval configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSpec {
    /// Number of future periods
    pub horizon: usize,
    /// Two-sided uncertainty interval, e.g. 0.95
    pub interval: f64,
}

impl Default for ForecastSpec {
    fn default() -> Self {
        Self {
            horizon: 24,
            interval: 0.95,
        }
    }
}

/// One forecast step: point estimate plus uncertainty bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: Timestamp,
    pub yhat: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
}

/// Forecaster port: `(fetched frame, spec) -> forecast`, invoked at most once
/// per pipeline run
pub trait Forecaster: Send + Sync {
    fn forecast(&self, frame: &Frame, spec: &ForecastSpec) -> ComputeResult<Forecast>;
}

/// Directional signal emitted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Per-class probability, keyed by direction name
    pub probabilities: BTreeMap<String, f64>,
}

/// Classifier port: `(engineered features) -> directional signal`
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &[f64]) -> ComputeResult<Signal>;
}

/// Chart artifact request; rendering internals are a collaborator concern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Columns to plot: built-in frame columns or computed indicator columns
    pub columns: Vec<String>,
    /// Output file stem; a generated name is used when absent
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Renders a finished pipeline context into a file artifact.
///
/// The renderer receives the frame and computed columns read-only; it cannot
/// mutate the context.
pub trait ArtifactRenderer: Send + Sync {
    fn render(
        &self,
        frame: &Frame,
        computed: &BTreeMap<String, Vec<f64>>,
        spec: &ChartSpec,
        dir: &Path,
    ) -> Result<PathBuf, ComputeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl Indicator for Dummy {
        fn id(&self) -> &'static str {
            "trend.sma"
        }
        fn min_bars(&self, _params: &IndicatorParams) -> usize {
            1
        }
        fn default_column(&self, _params: &IndicatorParams) -> String {
            "sma".to_string()
        }
        fn compute(&self, close: &[f64], _params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
            Ok(close.to_vec())
        }
    }

    #[test]
    fn resolve_accepts_prefix_and_bare_name() {
        let mut set = IndicatorSet::new();
        set.register(Arc::new(Dummy));

        assert!(set.resolve("trend.sma").is_some());
        assert!(set.resolve("ta.trend.sma").is_some());
        assert!(set.resolve("sma").is_some());
        assert!(set.resolve("wma").is_none());
    }
}
