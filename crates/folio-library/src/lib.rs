//! Folio Library - Catalogue and Commerce Data Access
//!
//! Typed repositories, reports and index declarations for the library
//! (`books`) and commerce (`users`, `products`, `orders`) databases.
//!
//! Key Features:
//! - Schema-checked entities with canonical field names
//! - Repositories with all-or-nothing batch inserts
//! - Aggregation reports over both databases
//! - Declarative indexes applied at start-up
//!
//! @version 0.1.0
//! @author Folio Development Team

pub mod indexes;
pub mod reports;
pub mod repository;
pub mod samples;
pub mod schema;

pub use indexes::{apply_indexes, declarations, AppliedIndex, IndexDeclaration};
pub use reports::{ProductUnits, Reports};
pub use repository::{Record, Repository};
pub use samples::{seed, SeedSummary};
pub use schema::{Address, Book, Domain, Entity, LineItem, Order, OrderStatus, Product, User};

use folio_client::{Client, ClientConfig, Database, DocumentStore};
use folio_common::{FolioConfig, Result};
use std::sync::Arc;
use tracing::info;

/// Everything a caller needs, wired to one store.
pub struct Folio {
    client: Client,
    library: Database,
    commerce: Database,
    pub books: Repository<Book>,
    pub users: Repository<User>,
    pub products: Repository<Product>,
    pub orders: Repository<Order>,
    pub reports: Reports,
}

impl Folio {
    /// Connect to `config.store.uri`. The configured retry policy applies
    /// unless the URI sets `retries` itself.
    pub async fn connect(config: &FolioConfig) -> Result<Self> {
        let mut client_config = ClientConfig::from_url(&config.store.uri)?;
        let max_retries = if client_config.options.iter().any(|(k, _)| k == "retries") {
            client_config.retry.max_retries
        } else {
            config.retry.max_retries
        };
        client_config.retry = config.retry.clone();
        client_config.retry.max_retries = max_retries;

        let client = Client::new(client_config).await?;
        let library = client.database(&config.store.library_database)?;
        let commerce = client.database(&config.store.commerce_database)?;

        let library_store: Arc<dyn DocumentStore> = Arc::new(library.clone());
        let commerce_store: Arc<dyn DocumentStore> = Arc::new(commerce.clone());
        let validation = config.validation.clone();

        Ok(Self {
            books: Repository::new(library_store.clone()).with_validation(validation.clone()),
            users: Repository::new(commerce_store.clone()).with_validation(validation.clone()),
            products: Repository::new(commerce_store.clone()).with_validation(validation.clone()),
            orders: Repository::new(commerce_store.clone()).with_validation(validation),
            reports: Reports::new(library_store, commerce_store),
            client,
            library,
            commerce,
        })
    }

    /// Create collections with their schemas, then apply the declared
    /// indexes.
    pub async fn init(&self) -> Result<Vec<AppliedIndex>> {
        self.books.init().await?;
        self.users.init().await?;
        self.products.init().await?;
        self.orders.init().await?;

        let applied = apply_indexes(&self.library, &self.commerce).await?;
        info!(
            indexes = applied.len(),
            created = applied.iter().filter(|a| a.created).count(),
            "Initialised stores"
        );
        Ok(applied)
    }

    pub fn library(&self) -> &Database {
        &self.library
    }

    pub fn commerce(&self) -> &Database {
        &self.commerce
    }

    pub async fn close(&self) {
        self.client.close().await;
    }
}
