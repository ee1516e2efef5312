//! Unified error types for Duehook.

use thiserror::Error;

/// Result type alias using DuehookError.
pub type Result<T> = std::result::Result<T, DuehookError>;

#[derive(Error, Debug)]
pub enum DuehookError {
    // Lookup errors
    #[error("No scheduled hook with id: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Storage errors
    #[error("Store error: {0}")]
    Store(String),

    // Delivery errors
    #[error("Webhook delivery failed: {0}")]
    Delivery(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DuehookError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DuehookError::NotFound("acc1_2h".into());
        assert!(err.to_string().contains("acc1_2h"));

        let err = DuehookError::Store("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_constructors() {
        let e1 = DuehookError::not_found("x");
        assert!(matches!(e1, DuehookError::NotFound(_)));

        let e2 = DuehookError::invalid_argument("missing filter");
        assert!(matches!(e2, DuehookError::InvalidArgument(_)));

        let e3 = DuehookError::store("locked");
        assert!(matches!(e3, DuehookError::Store(_)));

        let e4 = DuehookError::delivery("status 500");
        assert!(matches!(e4, DuehookError::Delivery(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DuehookError = io_err.into();
        assert!(matches!(err, DuehookError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DuehookError = json_err.into();
        assert!(matches!(err, DuehookError::Json(_)));
    }
}
