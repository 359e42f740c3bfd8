//! Folio Common - Shared Types and Utilities
//!
//! Error handling and configuration shared by every Folio crate. Provides
//! the single error type callers match on and the configuration loaded by
//! the binary.
//!
//! Key Features:
//! - Unified error type with retryable error detection
//! - TOML configuration with environment overrides
//! - Retry policy used by the store-connection client
//!
//! @version 0.1.0
//! @author Folio Development Team

pub mod config;
pub mod error;

pub use config::{FolioConfig, LoggingConfig, RetryConfig, StoreConfig, ValidationConfig};
pub use error::{ErrorKind, FolioError, Result};
