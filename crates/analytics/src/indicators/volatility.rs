//! Volatility indicators: Bollinger bands
//!
//! Split into upper and lower indicators so each produces a single column
//! and composes with the pipeline like any other indicator.

use super::{require_bars, sma_series, window_or};
use meridian_ports::{ComputeResult, Indicator, IndicatorParams};

const BOLLINGER_DEFAULT_WINDOW: usize = 20;
const BOLLINGER_K: f64 = 2.0;

fn band(close: &[f64], window: usize, sign: f64) -> Vec<f64> {
    let mid = sma_series(close, window);
    let mut out = vec![f64::NAN; close.len()];
    for i in (window - 1)..close.len() {
        let slice = &close[i + 1 - window..=i];
        let mean = mid[i];
        let variance = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
        out[i] = mean + sign * BOLLINGER_K * variance.sqrt();
    }
    out
}

pub struct BollingerUpper;

impl Indicator for BollingerUpper {
    fn id(&self) -> &'static str {
        "volatility.bollinger_upper"
    }

    fn min_bars(&self, params: &IndicatorParams) -> usize {
        window_or(params, BOLLINGER_DEFAULT_WINDOW) + 10
    }

    fn default_column(&self, params: &IndicatorParams) -> String {
        format!("bb_upper_{}", window_or(params, BOLLINGER_DEFAULT_WINDOW))
    }

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
        let window = window_or(params, BOLLINGER_DEFAULT_WINDOW);
        require_bars(self.id(), close, self.min_bars(params))?;
        Ok(band(close, window, 1.0))
    }
}

pub struct BollingerLower;

impl Indicator for BollingerLower {
    fn id(&self) -> &'static str {
        "volatility.bollinger_lower"
    }

    fn min_bars(&self, params: &IndicatorParams) -> usize {
        window_or(params, BOLLINGER_DEFAULT_WINDOW) + 10
    }

    fn default_column(&self, params: &IndicatorParams) -> String {
        format!("bb_lower_{}", window_or(params, BOLLINGER_DEFAULT_WINDOW))
    }

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
        let window = window_or(params, BOLLINGER_DEFAULT_WINDOW);
        require_bars(self.id(), close, self.min_bars(params))?;
        Ok(band(close, window, -1.0))
    }
}
