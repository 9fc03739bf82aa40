//! Meridian Pipeline
//!
//! Multi-step analysis over a single fetch. A request names one market-data
//! query and any number of derived steps; the orchestrator fetches once
//! through the gateway and fans the frame out to indicators, an optional
//! forecast with classification, and an optional chart artifact. Recoverable
//! step failures ride along with the partial results.

pub mod context;
pub mod error;
pub mod features;
pub mod orchestrator;
pub mod request;

pub use context::{PipelineReport, StepFailure};
pub use error::PipelineError;
pub use orchestrator::Pipeline;
pub use request::{ForecastRequest, IndicatorStep, PipelineRequest};
