use thiserror::Error;

/// Connection-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Connection failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Terminal connection lost: {0}")]
    Lost(String),
}

pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;
