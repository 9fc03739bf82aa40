//! Momentum indicators: RSI

use super::{require_bars, window_or};
use meridian_ports::{ComputeResult, Indicator, IndicatorParams};

const RSI_DEFAULT_WINDOW: usize = 14;

/// Wilder's relative strength index, 0..100
pub struct Rsi;

impl Indicator for Rsi {
    fn id(&self) -> &'static str {
        "momentum.rsi"
    }

    fn min_bars(&self, params: &IndicatorParams) -> usize {
        window_or(params, RSI_DEFAULT_WINDOW) + 10
    }

    fn default_column(&self, params: &IndicatorParams) -> String {
        format!("rsi_{}", window_or(params, RSI_DEFAULT_WINDOW))
    }

    fn compute(&self, close: &[f64], params: &IndicatorParams) -> ComputeResult<Vec<f64>> {
        let window = window_or(params, RSI_DEFAULT_WINDOW);
        require_bars(self.id(), close, self.min_bars(params))?;

        let mut out = vec![f64::NAN; close.len()];
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;

        // Seed with the arithmetic mean of the first window's moves
        for i in 1..=window {
            let delta = close[i] - close[i - 1];
            if delta >= 0.0 {
                avg_gain += delta;
            } else {
                avg_loss -= delta;
            }
        }
        avg_gain /= window as f64;
        avg_loss /= window as f64;
        out[window] = rsi_value(avg_gain, avg_loss);

        // Wilder smoothing from then on
        for i in (window + 1)..close.len() {
            let delta = close[i] - close[i - 1];
            let (gain, loss) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
            avg_gain = (avg_gain * (window as f64 - 1.0) + gain) / window as f64;
            avg_loss = (avg_loss * (window as f64 - 1.0) + loss) / window as f64;
            out[i] = rsi_value(avg_gain, avg_loss);
        }
        Ok(out)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_saturates_on_monotone_series() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let out = Rsi.compute(&rising, &IndicatorParams::default()).unwrap();
        assert!(out[13].is_nan());
        assert_eq!(out[14], 100.0);
        assert!(out[39] > 99.0);

        let falling: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        let out = Rsi.compute(&falling, &IndicatorParams::default()).unwrap();
        assert_eq!(out[14], 0.0);
    }

    #[test]
    fn rsi_is_bounded_on_noisy_input() {
        let noisy: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i * 7919) % 13) as f64 - 6.0)
            .collect();
        let out = Rsi.compute(&noisy, &IndicatorParams { window: Some(10) }).unwrap();
        for v in out.iter().skip(10) {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
