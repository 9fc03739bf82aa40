use thiserror::Error;

/// Errors raised by the terminal collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminalError {
    #[error("Terminal is not connected")]
    NotConnected,

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Symbol not known to terminal: {0}")]
    SymbolUnknown(String),

    #[error("History unavailable: {0}")]
    History(String),

    #[error("Request rejected by terminal: {0}")]
    Rejected(String),

    #[error("Terminal I/O error: {0}")]
    Io(String),
}

impl TerminalError {
    /// Connection-class errors degrade the connection manager; everything
    /// else is an operation-level failure.
    pub fn is_connection_class(&self) -> bool {
        matches!(
            self,
            TerminalError::NotConnected | TerminalError::ConnectionLost(_) | TerminalError::Io(_)
        )
    }
}

/// Errors raised by indicator/forecast/classifier collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Computation failed: {0}")]
    Failed(String),
}

pub type TerminalResult<T> = std::result::Result<T, TerminalError>;
pub type ComputeResult<T> = std::result::Result<T, ComputeError>;
