use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToonifyError {
    #[error("Invalid input: {0}")]
    InvalidInputError(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Protocol error: {0}")]
    ProtocolError(String),
    #[error("Generation not found: {0}")]
    NotFoundError(String),
    #[error("Duplicate generation id: {0}")]
    DuplicateIdError(String),
    #[error("Invalid status transition: {0}")]
    InvalidTransitionError(String),
    #[error("Generation is already being polled: {0}")]
    AlreadyPollingError(String),
    #[error("Delete rejected: {0}")]
    DeleteRejectedError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ToonifyError {
    /// Whether the caller may reasonably offer the user a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToonifyError::TransportError(_))
    }
}

impl From<serde_json::Error> for ToonifyError {
    fn from(err: serde_json::Error) -> Self {
        ToonifyError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ToonifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_category() {
        let err = ToonifyError::AuthError("missing token".into());
        assert_eq!(err.to_string(), "Authentication error: missing token");

        let err = ToonifyError::DuplicateIdError("42".into());
        assert_eq!(err.to_string(), "Duplicate generation id: 42");
    }

    #[test]
    fn test_only_transport_errors_are_retryable() {
        assert!(ToonifyError::TransportError("reset".into()).is_retryable());
        assert!(!ToonifyError::AuthError("expired".into()).is_retryable());
        assert!(!ToonifyError::ProtocolError("bad json".into()).is_retryable());
    }

    #[test]
    fn test_json_errors_become_serialization_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(
            ToonifyError::from(err),
            ToonifyError::SerializationError(_)
        ));
    }
}
