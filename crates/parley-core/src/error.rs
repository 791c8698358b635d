use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event arrived in a state that does not accept it.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection not joined: {conn}")]
    NotFound { conn: String },

    #[error("Connection already joined: {conn}")]
    AlreadyJoined { conn: String },

    #[error("Invalid display name: {0}")]
    InvalidName(String),

    #[error("Delivery to {conn} failed: {reason}")]
    Transport { conn: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl ParleyError {
    /// Short error code string sent to clients in `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            ParleyError::Config(_) => "CONFIG_ERROR",
            ParleyError::Protocol(_) => "PROTOCOL_ERROR",
            ParleyError::NotFound { .. } => "NOT_JOINED",
            ParleyError::AlreadyJoined { .. } => "ALREADY_JOINED",
            ParleyError::InvalidName(_) => "INVALID_NAME",
            ParleyError::Transport { .. } => "TRANSPORT_ERROR",
            ParleyError::Serialization(_) => "SERIALIZATION_ERROR",
            ParleyError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    /// Protocol-level faults are dropped without closing the connection.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ParleyError::Protocol(_)
                | ParleyError::NotFound { .. }
                | ParleyError::AlreadyJoined { .. }
                | ParleyError::InvalidName(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failures_count_as_protocol_errors() {
        let err = ParleyError::NotFound { conn: "c1".into() };
        assert!(err.is_protocol());
        assert_eq!(err.code(), "NOT_JOINED");
    }

    #[test]
    fn transport_errors_are_not_protocol_errors() {
        let err = ParleyError::Transport {
            conn: "c1".into(),
            reason: "queue full".into(),
        };
        assert!(!err.is_protocol());
        assert_eq!(err.to_string(), "Delivery to c1 failed: queue full");
    }

    #[test]
    fn encode_failures_convert_to_serialization_errors() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ParleyError = bad.into();
        assert_eq!(err.code(), "SERIALIZATION_ERROR");
        assert!(!err.is_protocol());
    }
}
