use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote service answered with a non-success HTTP status.
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The request never produced a usable response (connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::StorageError(_))
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Service { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }

    /// HTTP status carried by a `Service` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::service(status.as_u16(), e.to_string());
        }
        if e.is_decode() {
            return Self::parse(e.to_string());
        }
        Self::transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(DomainError::service(429, "slow down").is_transient());
        assert!(DomainError::service(503, "unavailable").is_transient());
        assert!(DomainError::service(408, "timeout").is_transient());
        assert!(DomainError::transport("connection reset").is_transient());
        assert!(!DomainError::service(400, "bad request").is_transient());
        assert!(!DomainError::service(401, "unauthorized").is_transient());
        assert!(!DomainError::invalid_input("x").is_transient());
    }

    #[test]
    fn service_error_exposes_status() {
        let err = DomainError::service(404, "missing");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Service error (404): missing");
        assert_eq!(DomainError::internal("x").status(), None);
    }
}
