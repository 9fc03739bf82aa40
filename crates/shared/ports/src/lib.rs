//! Meridian Ports
//!
//! Trait seams between the core and its collaborators: the external terminal,
//! the indicator library, the forecaster and the classifier. Infrastructure
//! crates implement these; the gateway and pipeline only ever talk to the
//! traits.

pub mod analytics;
pub mod error;
pub mod terminal;

pub use analytics::{
    ArtifactRenderer, ChartSpec, Classifier, Direction, Forecast, ForecastPoint, ForecastSpec,
    Forecaster, Indicator, IndicatorParams, IndicatorSet, Signal,
};
pub use error::{ComputeError, ComputeResult, TerminalError, TerminalResult};
pub use terminal::Terminal;
