//! Folio Client Database
//!
//! Database handles served by the in-process document engine.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::error::ClientError;
use crate::retry::retry_with_backoff;
use crate::store::DocumentStore;
use async_trait::async_trait;
use folio_common::{FolioError, Result, RetryConfig};
use folio_document::{
    Document, DocumentEngine, DocumentId, EngineError, IndexSpec, Pipeline, Query, Schema,
    Update, UpdateResult, Value,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

// =============================================================================
// Deployment
// =============================================================================

/// The set of databases behind one store address.
#[derive(Default)]
pub(crate) struct Deployment {
    databases: RwLock<HashMap<String, Arc<DocumentEngine>>>,
}

impl Deployment {
    /// Deployment shared by every client of `address` in this process.
    ///
    /// Shared deployments are never evicted. Their data outlives every
    /// client, so reconnecting to an address after a close sees the same
    /// databases. Use `mem://` for stores that should die with their client.
    pub(crate) fn shared(address: &str) -> Arc<Deployment> {
        static SHARED: OnceLock<Mutex<HashMap<String, Arc<Deployment>>>> = OnceLock::new();

        SHARED
            .get_or_init(Default::default)
            .lock()
            .entry(address.to_string())
            .or_default()
            .clone()
    }

    pub(crate) fn engine(&self, name: &str) -> Arc<DocumentEngine> {
        if let Some(engine) = self.databases.read().get(name) {
            return engine.clone();
        }
        self.databases
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(database = %name, "Created database");
                Arc::new(DocumentEngine::new())
            })
            .clone()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to one database. Cheap to clone; every clone stops working once
/// the owning client is closed.
#[derive(Clone)]
pub struct Database {
    name: String,
    engine: Arc<DocumentEngine>,
    connected: Arc<AtomicBool>,
    retry: RetryConfig,
}

impl Database {
    pub(crate) fn new(
        name: String,
        engine: Arc<DocumentEngine>,
        connected: Arc<AtomicBool>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            name,
            engine,
            connected,
            retry,
        }
    }

    /// Run one engine call under the retry policy.
    async fn call<T>(
        &self,
        operation: &str,
        mut f: impl FnMut(&DocumentEngine) -> std::result::Result<T, EngineError> + Send,
    ) -> Result<T> {
        retry_with_backoff(&self.retry, operation, || {
            let result = if self.connected.load(Ordering::SeqCst) {
                f(&self.engine).map_err(|e| FolioError::from(ClientError::from(e)))
            } else {
                Err(ClientError::NotConnected.into())
            };
            std::future::ready(result)
        })
        .await
    }
}

#[async_trait]
impl DocumentStore for Database {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_collection(&self, collection: &str, schema: Option<Schema>) -> Result<()> {
        self.call("ensure_collection", |e| {
            e.ensure_collection(collection, schema.clone()).map(|_| ())
        })
        .await
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.call("drop_collection", |e| e.drop_collection(collection)).await?;
        info!(database = %self.name, collection, "Dropped collection");
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.call("list_collections", |e| Ok(e.list_collections())).await
    }

    async fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<bool> {
        self.call("create_index", |e| e.create_index(collection, spec.clone()))
            .await
    }

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>> {
        self.call("list_indexes", |e| e.list_indexes(collection)).await
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<DocumentId> {
        self.call("insert", |e| e.insert(collection, doc.clone())).await
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<DocumentId>> {
        self.call("insert_many", |e| e.insert_many(collection, docs.clone()))
            .await
    }

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        self.call("get", |e| e.get(collection, id)).await
    }

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.call("find", |e| e.find(collection, query).map(|r| r.documents))
            .await
    }

    async fn count(&self, collection: &str, query: &Query) -> Result<usize> {
        self.call("count", |e| e.count(collection, query)).await
    }

    async fn update_one(&self, collection: &str, query: &Query, update: &Update) -> Result<UpdateResult> {
        self.call("update_one", |e| e.update_one(collection, query, update))
            .await
    }

    async fn update_many(&self, collection: &str, query: &Query, update: &Update) -> Result<UpdateResult> {
        self.call("update_many", |e| e.update_many(collection, query, update))
            .await
    }

    async fn delete_one(&self, collection: &str, query: &Query) -> Result<usize> {
        self.call("delete_one", |e| e.delete_one(collection, query)).await
    }

    async fn delete_many(&self, collection: &str, query: &Query) -> Result<usize> {
        self.call("delete_many", |e| e.delete_many(collection, query)).await
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>> {
        self.call("aggregate", |e| e.aggregate(collection, pipeline)).await
    }
}

// =============================================================================
// Tests
// =============================================================================
