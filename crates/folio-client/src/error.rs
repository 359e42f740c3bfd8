//! Folio Client Error Types
//!
//! Client-side errors and their mapping onto `FolioError`.
//!
//! @version 0.1.0
//! @author Folio Development Team

use folio_common::FolioError;
use folio_document::{CollectionError, EngineError};
use std::fmt;

// =============================================================================
// Client Error
// =============================================================================

/// Errors that can occur during client operations.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Invalid URL format.
    InvalidUrl(String),
    /// URL scheme the client cannot serve.
    UnsupportedScheme(String),
    /// The client was closed.
    NotConnected,
    /// Invalid database name.
    InvalidDatabase(String),
    /// The store rejected the request.
    Store(EngineError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            Self::UnsupportedScheme(scheme) => write!(f, "Unsupported URL scheme: {}", scheme),
            Self::NotConnected => write!(f, "Not connected"),
            Self::InvalidDatabase(name) => write!(f, "Invalid database name: '{}'", name),
            Self::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<EngineError> for ClientError {
    fn from(err: EngineError) -> Self {
        Self::Store(err)
    }
}

impl ClientError {
    /// Check if the error is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) | Self::NotConnected
        )
    }
}

impl From<ClientError> for FolioError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidUrl(_) | ClientError::UnsupportedScheme(_) | ClientError::NotConnected => {
                FolioError::Connection(err.to_string())
            }
            ClientError::InvalidDatabase(_) => FolioError::validation(err.to_string()),
            ClientError::Store(err) => store_error(err),
        }
    }
}

fn store_error(err: EngineError) -> FolioError {
    match err {
        EngineError::CollectionNotFound(name) => {
            FolioError::NotFound(format!("collection '{}'", name))
        }
        EngineError::Collection(CollectionError::NotFound(id)) => {
            FolioError::NotFound(format!("document {}", id))
        }
        EngineError::Collection(err) => FolioError::Validation(err.messages()),
        EngineError::TooManyCollections => FolioError::Internal(err.to_string()),
        EngineError::CollectionExists(_)
        | EngineError::InvalidName(_)
        | EngineError::DocumentTooLarge { .. } => FolioError::validation(err.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
