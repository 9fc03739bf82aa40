//! Technical indicators
//!
//! Every indicator maps a close series to a derived series of the same
//! length; positions without enough lookback are NaN rather than dropped, so
//! computed columns always align with the source frame.
//!
//! `min_bars` is deliberately stricter than the arithmetic minimum: an RSI
//! over exactly `window` bars is computable but meaningless, so each
//! indicator demands a margin of extra history before it will run.

pub mod momentum;
pub mod trend;
pub mod volatility;

pub use momentum::Rsi;
pub use trend::{Ema, Macd, Sma};
pub use volatility::{BollingerLower, BollingerUpper};

use meridian_ports::{ComputeError, ComputeResult, IndicatorParams, IndicatorSet};
use std::sync::Arc;

/// The standard indicator table
pub fn standard_indicators() -> IndicatorSet {
    let mut set = IndicatorSet::new();
    set.register(Arc::new(Sma));
    set.register(Arc::new(Ema));
    set.register(Arc::new(Rsi));
    set.register(Arc::new(Macd));
    set.register(Arc::new(BollingerUpper));
    set.register(Arc::new(BollingerLower));
    set
}

pub(crate) fn window_or(params: &IndicatorParams, default: usize) -> usize {
    params.window.unwrap_or(default).max(1)
}

pub(crate) fn require_bars(id: &str, close: &[f64], required: usize) -> ComputeResult<()> {
    if close.len() < required {
        return Err(ComputeError::InsufficientData {
            required,
            available: close.len(),
        });
    }
    if close.iter().any(|v| !v.is_finite()) {
        return Err(ComputeError::Invalid(format!(
            "{id}: input series contains non-finite values"
        )));
    }
    Ok(())
}

/// Simple moving average over a window, NaN until the window fills
pub(crate) fn sma_series(close: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; close.len()];
    let mut sum = 0.0;
    for i in 0..close.len() {
        sum += close[i];
        if i >= window {
            sum -= close[i - window];
        }
        if i + 1 >= window {
            out[i] = sum / window as f64;
        }
    }
    out
}

/// Exponential moving average seeded with the first window's SMA
pub(crate) fn ema_series(close: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; close.len()];
    if close.len() < window {
        return out;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let seed: f64 = close[..window].iter().sum::<f64>() / window as f64;
    out[window - 1] = seed;
    let mut prev = seed;
    for i in window..close.len() {
        prev = alpha * close[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}
