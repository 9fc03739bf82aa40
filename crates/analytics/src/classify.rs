//! Momentum classifier
//!
//! Scores the mean of the engineered return features through a logistic
//! squash and emits a three-way directional signal. Probabilities always sum
//! to 1; ties and weak momentum resolve to Flat.

use log::debug;
use meridian_ports::{Classifier, ComputeError, ComputeResult, Direction, Signal};
use std::collections::BTreeMap;

/// Mean return below this magnitude (after scaling) reads as Flat
const FLAT_BAND: f64 = 0.15;

/// Logistic steepness applied to the mean return, tuned for per-bar
/// fractional returns
const SCALE: f64 = 400.0;

#[derive(Debug, Default)]
pub struct MomentumClassifier;

impl Classifier for MomentumClassifier {
    fn classify(&self, features: &[f64]) -> ComputeResult<Signal> {
        if features.is_empty() {
            return Err(ComputeError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        if features.iter().any(|f| !f.is_finite()) {
            return Err(ComputeError::Invalid(
                "features contain non-finite values".to_string(),
            ));
        }

        let mean = features.iter().sum::<f64>() / features.len() as f64;
        let score = SCALE * mean;
        let p_up = 1.0 / (1.0 + (-score).exp());
        let p_down = 1.0 - p_up;
        // Confidence in a direction at all, peaked when |score| is large
        let decisiveness = (p_up - 0.5).abs() * 2.0;
        let p_flat = (1.0 - decisiveness) * 0.5;

        let direction = if score > FLAT_BAND {
            Direction::Up
        } else if score < -FLAT_BAND {
            Direction::Down
        } else {
            Direction::Flat
        };
        debug!("momentum score {score:.4} -> {direction:?}");

        let norm = p_up + p_down + p_flat;
        let mut probabilities = BTreeMap::new();
        probabilities.insert("up".to_string(), p_up / norm);
        probabilities.insert("down".to_string(), p_down / norm);
        probabilities.insert("flat".to_string(), p_flat / norm);
        Ok(Signal {
            direction,
            probabilities,
        })
    }
}
