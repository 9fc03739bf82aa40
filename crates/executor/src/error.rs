//! Executor error taxonomy

use meridian_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("Script exceeds the {limit}-character limit ({actual} characters)")]
    TooLong { limit: usize, actual: usize },

    #[error("Forbidden construct '{construct}': {reason}")]
    Forbidden { construct: String, reason: String },

    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Runtime error on line {line}: {message}")]
    Runtime { line: usize, message: String },

    #[error("Script produced no result")]
    NoResult {
        /// Names the script did bind, to help the caller pick one
        bindings: Vec<String>,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ExecError {
    /// Stable machine-readable kind, used by the transport layer
    pub fn kind(&self) -> &'static str {
        match self {
            // An over-long script is a malformed script
            ExecError::TooLong { .. } => "SYNTAX_ERROR",
            ExecError::Syntax { .. } => "SYNTAX_ERROR",
            ExecError::Forbidden { .. } => "FORBIDDEN_CONSTRUCT",
            ExecError::Runtime { .. } => "RUNTIME_ERROR",
            ExecError::NoResult { .. } => "NO_RESULT",
            ExecError::Gateway(inner) => inner.kind(),
        }
    }

    /// Human-actionable next step, when one exists
    pub fn suggestion(&self) -> Option<String> {
        match self {
            ExecError::Gateway(inner) => inner.suggestion(),
            ExecError::NoResult { bindings } if !bindings.is_empty() => Some(format!(
                "Assign the value you want to a variable named 'result' (script bound: {})",
                bindings.join(", ")
            )),
            ExecError::NoResult { .. } => {
                Some("Assign the value you want to a variable named 'result'".to_string())
            }
            ExecError::Forbidden { .. } => {
                Some("Use only the read-only data operations and indicator helpers".to_string())
            }
            _ => None,
        }
    }
}

pub type ExecResult<T> = std::result::Result<T, ExecError>;
