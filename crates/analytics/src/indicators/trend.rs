//! Trend indicators: SMA, EMA, MACD

use super::{ema_series, require_bars, sma_series, window_or};
use meridian_ports::{ComputeResult, Indicator, IndicatorParams};

const SMA_DEFAULT_WINDOW: usize = 20;
const EMA_DEFAULT_WINDOW: usize = 20;

// Classic MACD periods; the window parameter is ignored
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_MIN_BARS: usize = 35;

pub struct Sma;

impl Indicator for Sma {
    fn id(&self) -> &'static str {
        "trend.sma"
    }

    fn min_bars(&self, params: &IndicatorParams) -> usize {
        window_or(params, SMA_DEFAULT_WINDOW) + 5
    }

    fn default_column(&self, params: &IndicatorParams) -> String {
        format!("sma_{}", window_or(params, SMA_DEFAULT_WINDOW))
    }

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
        let window = window_or(params, SMA_DEFAULT_WINDOW);
        require_bars(self.id(), close, self.min_bars(params))?;
        Ok(sma_series(close, window))
    }
}

pub struct Ema;

impl Indicator for Ema {
    fn id(&self) -> &'static str {
        "trend.ema"
    }

    fn min_bars(&self, params: &IndicatorParams) -> usize {
        window_or(params, EMA_DEFAULT_WINDOW) + 5
    }

    fn default_column(&self, params: &IndicatorParams) -> String {
        format!("ema_{}", window_or(params, EMA_DEFAULT_WINDOW))
    }

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
        let window = window_or(params, EMA_DEFAULT_WINDOW);
        require_bars(self.id(), close, self.min_bars(params))?;
        Ok(ema_series(close, window))
    }
}

/// MACD line (fast EMA minus slow EMA)
pub struct Macd;

impl Indicator for Macd {
    fn id(&self) -> &'static str {
        "trend.macd"
    }

    fn min_bars(&self, _params: &IndicatorParams) -> usize {
        MACD_MIN_BARS
    }

    fn default_column(&self, _params: &IndicatorParams) -> String {
        "macd".to_string()
    }

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
        require_bars(self.id(), close, self.min_bars(params))?;
        let fast = ema_series(close, MACD_FAST);
        let slow = ema_series(close, MACD_SLOW);
        Ok(fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| f - s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 0.5 * i as f64).collect()
    }

    #[test]
    fn macd_is_positive_in_an_uptrend() {
        let out = Macd.compute(&trending(80), &IndicatorParams::default()).unwrap();
        assert_eq!(out.len(), 80);
        assert!(out[MACD_SLOW - 2].is_nan());
        assert!(out[79] > 0.0);
    }

    #[test]
    fn default_columns_carry_the_window() {
        assert_eq!(Sma.default_column(&IndicatorParams { window: Some(50) }), "sma_50");
        assert_eq!(Ema.default_column(&IndicatorParams::default()), "ema_20");
    }
}
