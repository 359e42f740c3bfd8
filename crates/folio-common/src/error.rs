//! Folio Error - Unified Error Types
//!
//! Error handling shared by the document client, the repositories and the
//! reporting layer. Every failure surfaces to the caller as a `FolioError`
//! whose kind tells validation problems, missing records, store
//! connectivity and empty aggregations apart.
//!
//! Key Features:
//! - Four caller-facing kinds (validation, not found, connection, empty result)
//! - Retryable error detection for the connection collaborator
//! - Seamless integration with std::io::Error and serde_json::Error
//!
//! @version 0.1.0
//! @author Folio Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all Folio operations.
#[derive(Error, Debug)]
pub enum FolioError {
    /// A required field is missing, a value is malformed, or a uniqueness
    /// constraint would be violated.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// The store dropped the request part-way; safe to resend.
    #[error("transient connection error: {0}")]
    Transient(String),

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Serialization(err.to_string())
    }
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for Folio operations.
pub type Result<T> = std::result::Result<T, FolioError>;

// =============================================================================
// Error Classification
// =============================================================================

/// Coarse classification of a `FolioError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Connection,
    EmptyResult,
    Other,
}

impl FolioError {
    /// Shorthand for a validation error with a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        FolioError::Validation(vec![message.into()])
    }

    /// Returns the caller-facing kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::Validation(_) => ErrorKind::Validation,
            FolioError::NotFound(_) => ErrorKind::NotFound,
            FolioError::Connection(_) | FolioError::Transient(_) | FolioError::Timeout(_) => {
                ErrorKind::Connection
            }
            FolioError::EmptyResult(_) => ErrorKind::EmptyResult,
            _ => ErrorKind::Other,
        }
    }

    /// Returns true if the request can be safely resent to the store.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FolioError::Transient(_) | FolioError::Timeout(_))
    }

    /// Validation messages carried by this error, empty for other kinds.
    pub fn messages(&self) -> &[String] {
        match self {
            FolioError::Validation(messages) => messages,
            _ => &[],
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FolioError::Validation(vec![
            "Missing required field: title".to_string(),
            "Field 'rating': Value 7 is greater than maximum 5".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: Missing required field: title; Field 'rating': Value 7 is greater than maximum 5"
        );

        let err = FolioError::EmptyResult("books".to_string());
        assert_eq!(err.to_string(), "empty result: books");
    }

    #[test]
    fn test_kind() {
        assert_eq!(FolioError::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(FolioError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(FolioError::Connection("down".into()).kind(), ErrorKind::Connection);
        assert_eq!(FolioError::Transient("reset".into()).kind(), ErrorKind::Connection);
        assert_eq!(FolioError::EmptyResult("x".into()).kind(), ErrorKind::EmptyResult);
        assert_eq!(FolioError::Internal("x".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_is_retryable() {
        assert!(FolioError::Transient("reset".into()).is_retryable());
        assert!(FolioError::Timeout("slow".into()).is_retryable());
        assert!(!FolioError::Connection("closed".into()).is_retryable());
        assert!(!FolioError::validation("dup").is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = FolioError::validation("duplicate ISBN");
        assert_eq!(err.messages(), ["duplicate ISBN".to_string()]);
        assert!(FolioError::NotFound("x".into()).messages().is_empty());
    }

    #[test]
    fn test_from_json_error() {
        let err: FolioError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, FolioError::Serialization(_)));
    }
}
