//! Feature engineering for the classifier

use meridian_ports::{ComputeError, ComputeResult};

/// Fractional bar-to-bar returns over the last `lookback` moves
pub fn lookback_returns(close: &[f64], lookback: usize) -> ComputeResult<Vec<f64>> {
    if lookback == 0 {
        return Err(ComputeError::Invalid("lookback must be positive".to_string()));
    }
    if close.len() < lookback + 1 {
        return Err(ComputeError::InsufficientData {
            required: lookback + 1,
            available: close.len(),
        });
    }
    let start = close.len() - lookback - 1;
    let returns = close[start..]
        .windows(2)
        .map(|w| {
            if w[0] == 0.0 {
                0.0
            } else {
                (w[1] - w[0]) / w[0]
            }
        })
        .collect();
    Ok(returns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_have_the_requested_length() {
        let close: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let returns = lookback_returns(&close, 5).unwrap();
        assert_eq!(returns.len(), 5);
        // Last return of a 29 -> 30 move
        assert!((returns[4] - 1.0 / 29.0).abs() < 1e-12);
    }

    #[test]
    fn short_series_is_rejected_with_counts() {
        let err = lookback_returns(&[1.0, 2.0], 5).unwrap_err();
        assert_eq!(
            err,
            ComputeError::InsufficientData {
                required: 6,
                available: 2
            }
        );
    }
}
