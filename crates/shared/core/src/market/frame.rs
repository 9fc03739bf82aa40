//! In-memory tabular view over a fetched bar series
//!
//! A `Frame` is the single dataset a pipeline run fetches once and every
//! downstream step (indicators, forecast, chart artifact) reads from.

use crate::market::bar::Bar;
use crate::values::Timestamp;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Column-addressable table of bars.
///
/// Serializes as the bare bar array so responses read as a row list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame {
    bars: Vec<Bar>,
}

impl Frame {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Bar open times, oldest first
    pub fn times(&self) -> Vec<Timestamp> {
        self.bars.iter().map(|b| b.time).collect()
    }

    /// One price column as f64, for indicator/forecast math.
    ///
    /// Known columns: open, high, low, close, tick_volume, real_volume.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let series = match name {
            "open" => self.decimal_column(|b| b.open),
            "high" => self.decimal_column(|b| b.high),
            "low" => self.decimal_column(|b| b.low),
            "close" => self.decimal_column(|b| b.close),
            "tick_volume" => self.bars.iter().map(|b| b.tick_volume as f64).collect(),
            "real_volume" => self.bars.iter().map(|b| b.real_volume as f64).collect(),
            _ => return None,
        };
        Some(series)
    }

    /// Close prices as f64, the default indicator input
    pub fn close_series(&self) -> Vec<f64> {
        self.decimal_column(|b| b.close)
    }

    /// Names of the built-in columns
    pub fn column_names() -> &'static [&'static str] {
        &["open", "high", "low", "close", "tick_volume", "real_volume"]
    }

    /// Last `n` bars (all bars when n exceeds the length)
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    fn decimal_column(&self, f: impl Fn(&Bar) -> rust_decimal::Decimal) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| f(b).to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}
