//! Folio Client - Document Store Client
//!
//! Connects the data-access layer to a document store. The store is reached
//! through a connection URI and exposed as explicit `Database` handles that
//! implement the `DocumentStore` trait.
//!
//! Key Features:
//! - `folio://` and `mem://` URIs served by the in-process engine
//! - Async-first API with tokio integration
//! - Automatic retry with exponential backoff
//! - Store errors mapped onto `FolioError` kinds
//!
//! @version 0.1.0
//! @author Folio Development Team

pub mod config;
pub mod database;
pub mod error;
pub mod retry;
pub mod store;

pub use config::{ClientConfig, Scheme};
pub use database::Database;
pub use error::ClientError;
pub use retry::retry_with_backoff;
pub use store::DocumentStore;

use database::Deployment;
use folio_common::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// The main client for interacting with a Folio document store.
pub struct Client {
    config: ClientConfig,
    deployment: Arc<Deployment>,
    connected: Arc<AtomicBool>,
}

impl Client {
    /// Create a new client with the given configuration.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let deployment = match config.scheme {
            Scheme::Folio => Deployment::shared(&config.address()),
            Scheme::Memory => Arc::new(Deployment::default()),
        };

        info!(url = %config.redacted_url(), "Connected to document store");
        Ok(Self {
            config,
            deployment,
            connected: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Connect to a store with default settings.
    pub async fn connect(url: &str) -> Result<Self> {
        let config = ClientConfig::from_url(url)?;
        Self::new(config).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a handle to the named database, creating it on first use.
    pub fn database(&self, name: &str) -> Result<Database> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected.into());
        }
        if name.is_empty() || name.contains(['/', '.', ' ', '\0']) {
            return Err(ClientError::InvalidDatabase(name.to_string()).into());
        }

        Ok(Database::new(
            name.to_string(),
            self.deployment.engine(name),
            self.connected.clone(),
            self.config.retry.clone(),
        ))
    }

    /// Handle to the database named in the connection URI, if any.
    pub fn default_database(&self) -> Option<Result<Database>> {
        self.config.database.as_deref().map(|name| self.database(name))
    }

    /// Names of databases created so far.
    pub fn list_databases(&self) -> Vec<String> {
        self.deployment.names()
    }

    /// Check if the client is connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Disconnect. Every handle obtained from this client fails with a
    /// connection error afterwards.
    pub async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(url = %self.config.redacted_url(), "Closed document store connection");
        }
    }
}
