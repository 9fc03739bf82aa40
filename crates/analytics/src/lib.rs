//! Meridian Analytics
//!
//! Reference implementations of the analytics ports: the standard indicator
//! table, the drift forecaster, the momentum classifier and the CSV chart
//! renderer. All of it is pure computation over already-fetched data; no
//! terminal access happens here.

pub mod classify;
pub mod forecast;
pub mod indicators;
pub mod render;

pub use classify::MomentumClassifier;
pub use forecast::DriftForecaster;
pub use indicators::standard_indicators;
pub use render::CsvChartRenderer;
