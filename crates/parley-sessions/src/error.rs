use parley_core::error::ParleyError;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The connection has no registered participant.
    #[error("connection not registered: {conn}")]
    NotFound { conn: String },

    /// The connection already joined; display names are fixed for its lifetime.
    #[error("connection already registered: {conn}")]
    AlreadyRegistered { conn: String },

    #[error("display name must not be empty")]
    EmptyName,
}

impl From<SessionError> for ParleyError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound { conn } => ParleyError::NotFound { conn },
            SessionError::AlreadyRegistered { conn } => ParleyError::AlreadyJoined { conn },
            SessionError::EmptyName => {
                ParleyError::InvalidName("display name must not be empty".to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
