//! Gateway error taxonomy
//!
//! Every variant carries enough context to render an actionable message so a
//! calling agent can self-correct without a human in the loop.

use meridian_connection::ConnectionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Unknown operation '{name}'")]
    UnknownOperation {
        name: String,
        /// Nearest registered operation by string similarity
        suggestion: Option<String>,
    },

    #[error("Symbol '{symbol}' not found")]
    SymbolNotFound {
        symbol: String,
        /// Nearest catalog entries, best match first
        suggestions: Vec<String>,
    },

    #[error("Operation '{operation}' requires a symbol")]
    SymbolRequired { operation: String },

    #[error("Missing required parameter '{name}' for '{operation}'")]
    MissingParameter {
        operation: String,
        name: String,
        /// Rendered schema of the whole operation, for the suggestion
        schema: String,
    },

    #[error("Parameter '{name}' expects {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Invalid value '{value}' for parameter '{name}'")]
    EnumMismatch {
        name: String,
        value: String,
        valid: Vec<String>,
    },

    #[error("Parameter '{name}' out of range: {message}")]
    OutOfRange { name: String, message: String },

    #[error("Connection failure: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Operation '{operation}' failed upstream: {message}")]
    Upstream { operation: String, message: String },
}

impl GatewayError {
    /// Stable machine-readable kind, used by the transport layer
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownOperation { .. } => "UNKNOWN_OPERATION",
            GatewayError::SymbolNotFound { .. } => "SYMBOL_NOT_FOUND",
            GatewayError::SymbolRequired { .. } => "MISSING_PARAMETER",
            GatewayError::MissingParameter { .. } => "MISSING_PARAMETER",
            GatewayError::TypeMismatch { .. } => "TYPE_MISMATCH",
            GatewayError::EnumMismatch { .. } => "ENUM_MISMATCH",
            GatewayError::OutOfRange { .. } => "OUT_OF_RANGE_VALUE",
            GatewayError::Connection(_) => "CONNECTION_FAILURE",
            GatewayError::Upstream { .. } => "UPSTREAM_OPERATION_ERROR",
        }
    }

    /// Human-actionable next step, when one exists
    pub fn suggestion(&self) -> Option<String> {
        match self {
            GatewayError::UnknownOperation { suggestion, .. } => suggestion
                .as_ref()
                .map(|s| format!("Did you mean '{s}'?")),
            GatewayError::SymbolNotFound { suggestions, .. } => {
                if suggestions.is_empty() {
                    Some("Use the 'symbols_get' operation to list available symbols".to_string())
                } else {
                    Some(format!("Did you mean: {}?", suggestions.join(", ")))
                }
            }
            GatewayError::SymbolRequired { .. } => {
                Some("Add a 'symbol' field, e.g. \"EURUSD\"".to_string())
            }
            GatewayError::MissingParameter { name, schema, .. } => {
                if schema.is_empty() {
                    Some(format!("Add: {name}=<value>"))
                } else {
                    Some(format!("Add: {name}=<value>. Expected {schema}"))
                }
            }
            GatewayError::EnumMismatch { valid, .. } => {
                Some(format!("Valid values: {}", valid.join(", ")))
            }
            _ => None,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
