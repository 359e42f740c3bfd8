//! Folio Config - Configuration Structures
//!
//! Configuration types for the Folio service. Supports loading from TOML
//! files, environment variable overrides, and programmatic construction.
//! Every section has defaults suitable for the bundled in-process store.
//!
//! Key Features:
//! - Store connection (URI, database names)
//! - Retry policy for the store-connection collaborator
//! - Logging level
//! - Domain validation tolerances
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `store.uri`.
pub const ENV_URI: &str = "FOLIO_URI";
/// Environment variable overriding `logging.level`.
pub const ENV_LOG: &str = "FOLIO_LOG";

// =============================================================================
// Store Configuration
// =============================================================================

/// Where the document store lives and which databases hold which domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub uri: String,
    pub library_database: String,
    pub commerce_database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "mem://library".to_string(),
            library_database: "library".to_string(),
            commerce_database: "ecommerce".to_string(),
        }
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

/// Retry configuration for transient store failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given retry attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(Duration::from_millis(self.max_delay_ms))
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration; `level` is an `EnvFilter` directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Validation Configuration
// =============================================================================

/// Tolerances used by domain validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest accepted gap between an order's stated total and the sum of
    /// its line items.
    pub total_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            total_tolerance: 0.005,
        }
    }
}

// =============================================================================
// Folio Configuration
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FolioConfig {
    pub store: StoreConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
    pub validation: ValidationConfig,
}

impl FolioConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FolioError::Configuration(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using the given variable lookup.
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(uri) = lookup(ENV_URI).filter(|v| !v.is_empty()) {
            self.store.uri = uri;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
