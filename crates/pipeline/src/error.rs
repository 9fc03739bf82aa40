//! Pipeline error taxonomy

use meridian_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The single fetch failed; nothing downstream could run
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Operation '{operation}' does not produce a bar table")]
    NotTabular { operation: String },

    #[error("Step '{step}': need {required} bars, have {available}")]
    InsufficientData {
        step: String,
        required: usize,
        available: usize,
    },

    #[error("Step '{step}' failed: {message}")]
    Computation { step: String, message: String },
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Gateway(inner) => inner.kind(),
            PipelineError::NotTabular { .. } => "NOT_TABULAR",
            PipelineError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            PipelineError::Computation { .. } => "COMPUTATION_FAILED",
        }
    }

    pub fn suggestion(&self) -> Option<String> {
        match self {
            PipelineError::Gateway(inner) => inner.suggestion(),
            PipelineError::NotTabular { .. } => Some(
                "Use a bar-fetching operation such as 'copy_rates_from_pos' as the pipeline query"
                    .to_string(),
            ),
            PipelineError::InsufficientData { required, .. } => Some(format!(
                "Increase the query's 'count' to at least {required}"
            )),
            PipelineError::Computation { .. } => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
