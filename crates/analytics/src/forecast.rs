//! Drift forecaster
//!
//! Random walk with drift over the close series: the point estimate extends
//! the mean bar-to-bar move, and the uncertainty band widens with the square
//! root of the horizon. Crude, but it gives agents an honest baseline with
//! calibrated bounds instead of a false sense of precision.

use chrono::Duration;
use log::debug;
use meridian_core::Frame;
use meridian_ports::{ComputeError, ComputeResult, Forecast, ForecastPoint, ForecastSpec, Forecaster};

const MIN_HISTORY: usize = 10;

#[derive(Debug, Default)]
pub struct DriftForecaster;

impl Forecaster for DriftForecaster {
    fn forecast(&self, frame: &Frame, spec: &ForecastSpec) -> ComputeResult<Forecast> {
        if frame.len() < MIN_HISTORY {
            return Err(ComputeError::InsufficientData {
                required: MIN_HISTORY,
                available: frame.len(),
            });
        }
        if spec.horizon == 0 {
            return Err(ComputeError::Invalid("forecast horizon must be positive".to_string()));
        }
        if !(0.5..1.0).contains(&spec.interval) {
            return Err(ComputeError::Invalid(format!(
                "interval must be in [0.5, 1.0), got {}",
                spec.interval
            )));
        }

        let close = frame.close_series();
        let diffs: Vec<f64> = close.windows(2).map(|w| w[1] - w[0]).collect();
        let drift = diffs.iter().sum::<f64>() / diffs.len() as f64;
        let variance =
            diffs.iter().map(|d| (d - drift).powi(2)).sum::<f64>() / diffs.len() as f64;
        let sigma = variance.sqrt();
        let z = normal_quantile(0.5 + spec.interval / 2.0);
        debug!("drift forecast: drift={drift:.6} sigma={sigma:.6} z={z:.3}");

        let step = bar_interval(frame);
        let last_time = frame.times().last().copied().ok_or_else(|| {
            ComputeError::Invalid("frame has no timestamps".to_string())
        })?;
        let last_close = *close.last().unwrap_or(&f64::NAN);

        let points = (1..=spec.horizon)
            .map(|h| {
                let yhat = last_close + drift * h as f64;
                let spread = z * sigma * (h as f64).sqrt();
                ForecastPoint {
                    time: last_time + step * h as i32,
                    yhat,
                    lower: yhat - spread,
                    upper: yhat + spread,
                }
            })
            .collect();
        Ok(Forecast { points })
    }
}

/// Median gap between consecutive bars; robust to a few missing bars
fn bar_interval(frame: &Frame) -> Duration {
    let times = frame.times();
    let mut gaps: Vec<i64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .filter(|s| *s > 0)
        .collect();
    if gaps.is_empty() {
        return Duration::hours(1);
    }
    gaps.sort_unstable();
    Duration::seconds(gaps[gaps.len() / 2])
}

/// Inverse standard normal CDF (Acklam's rational approximation)
fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p >= 1.0 - P_LOW {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        return (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0);
    }
    // Callers pass p in (0.75, 1.0); the central branch covers the rest
    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}
