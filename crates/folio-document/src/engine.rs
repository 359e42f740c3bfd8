//! Folio Document Engine
//!
//! One database: a registry of named collections plus operation counters.
//! Every call resolves its collection by name first, so a dropped
//! collection fails with `CollectionNotFound` rather than acting on a stale
//! handle.
//!
//! @version 0.1.0
//! @author Folio Development Team

use crate::aggregate::Pipeline;
use crate::collection::{Collection, CollectionError, UpdateResult};
use crate::index::IndexSpec;
use crate::query::{Query, QueryResult};
use crate::types::{Document, DocumentId, Value};
use crate::update::Update;
use crate::validation::Schema;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Limits enforced by a [`DocumentEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest accepted document, measured as serialized JSON bytes.
    pub max_document_size: usize,
    pub max_collections: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_document_size: 16 << 20,
            max_collections: 1000,
        }
    }
}

// =============================================================================
// Counters
// =============================================================================

#[derive(Default)]
struct Counters {
    inserted: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
    queries: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: usize) {
        counter.fetch_add(by as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> EngineStats {
        EngineStats {
            documents_inserted: self.inserted.load(Ordering::Relaxed),
            documents_updated: self.updated.load(Ordering::Relaxed),
            documents_deleted: self.deleted.load(Ordering::Relaxed),
            queries_executed: self.queries.load(Ordering::Relaxed),
        }
    }

    fn clear(&self) {
        for counter in [&self.inserted, &self.updated, &self.deleted, &self.queries] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Operation counts since creation or the last [`DocumentEngine::reset_stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub documents_inserted: u64,
    pub documents_updated: u64,
    pub documents_deleted: u64,
    pub queries_executed: u64,
}

#[derive(Debug, Clone)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: usize,
    pub index_count: usize,
}

// =============================================================================
// Document Engine
// =============================================================================

pub struct DocumentEngine {
    config: EngineConfig,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    counters: Counters,
}

impl DocumentEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            collections: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    pub fn create_collection(&self, name: impl Into<String>) -> Result<(), EngineError> {
        self.register(name.into(), None).map(drop)
    }

    pub fn create_collection_with_schema(
        &self,
        name: impl Into<String>,
        schema: Schema,
    ) -> Result<(), EngineError> {
        self.register(name.into(), Some(schema)).map(drop)
    }

    fn register(&self, name: String, schema: Option<Schema>) -> Result<Arc<Collection>, EngineError> {
        if name.is_empty() || name.starts_with('$') || name.contains('\0') {
            return Err(EngineError::InvalidName(name));
        }

        let mut collections = self.collections.write();
        if collections.contains_key(&name) {
            return Err(EngineError::CollectionExists(name));
        }
        if collections.len() >= self.config.max_collections {
            return Err(EngineError::TooManyCollections);
        }

        let collection = Arc::new(match schema {
            Some(schema) => Collection::with_schema(name.clone(), schema),
            None => Collection::new(name.clone()),
        });
        debug!(collection = %name, "Created collection");
        collections.insert(name, collection.clone());
        Ok(collection)
    }

    /// The named collection, created on first use. A given schema replaces
    /// the collection's current one.
    pub fn ensure_collection(
        &self,
        name: &str,
        schema: Option<Schema>,
    ) -> Result<Arc<Collection>, EngineError> {
        let existing = self.collections.read().get(name).cloned();
        let collection = match existing {
            Some(collection) => collection,
            None => match self.register(name.to_string(), None) {
                Ok(collection) => collection,
                // Lost a creation race; use the winner's collection.
                Err(EngineError::CollectionExists(_)) => self.collection(name)?,
                Err(err) => return Err(err),
            },
        };
        if let Some(schema) = schema {
            collection.set_schema(schema);
        }
        Ok(collection)
    }

    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, EngineError> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))
    }

    pub fn drop_collection(&self, name: &str) -> Result<(), EngineError> {
        self.collections
            .write()
            .remove(name)
            .ok_or_else(|| EngineError::CollectionNotFound(name.to_string()))?;
        debug!(collection = %name, "Dropped collection");
        Ok(())
    }

    /// Collection names, sorted.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn collection_exists(&self, name: &str) -> bool {
        self.collections.read().contains_key(name)
    }

    pub fn collection_stats(&self, name: &str) -> Option<CollectionStats> {
        let collection = self.collections.read().get(name).cloned()?;
        Some(CollectionStats {
            name: name.to_string(),
            document_count: collection.count(),
            index_count: collection.index_names().len(),
        })
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    fn within_size(&self, doc: &Document) -> Result<(), EngineError> {
        let max = self.config.max_document_size;
        let size = doc.data_json().to_string().len();
        if size > max {
            Err(EngineError::DocumentTooLarge { size, max })
        } else {
            Ok(())
        }
    }

    pub fn insert(&self, collection: &str, doc: Document) -> Result<DocumentId, EngineError> {
        let target = self.collection(collection)?;
        self.within_size(&doc)?;
        let id = target.insert(doc)?;
        Counters::bump(&self.counters.inserted, 1);
        Ok(id)
    }

    /// Insert a batch; either every document is stored or none is.
    pub fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<DocumentId>, EngineError> {
        let target = self.collection(collection)?;
        docs.iter().try_for_each(|doc| self.within_size(doc))?;
        let ids = target.insert_many(docs)?;
        Counters::bump(&self.counters.inserted, ids.len());
        Ok(ids)
    }

    pub fn replace(&self, collection: &str, id: &DocumentId, doc: Document) -> Result<(), EngineError> {
        let target = self.collection(collection)?;
        self.within_size(&doc)?;
        target.replace(id, doc)?;
        Counters::bump(&self.counters.updated, 1);
        Ok(())
    }

    pub fn update_one(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
    ) -> Result<UpdateResult, EngineError> {
        let result = self.collection(collection)?.update_one(query, update)?;
        Counters::bump(&self.counters.updated, result.modified);
        Ok(result)
    }

    pub fn update_many(
        &self,
        collection: &str,
        query: &Query,
        update: &Update,
    ) -> Result<UpdateResult, EngineError> {
        let result = self.collection(collection)?.update_many(query, update)?;
        Counters::bump(&self.counters.updated, result.modified);
        Ok(result)
    }

    pub fn delete(&self, collection: &str, id: &DocumentId) -> Result<Document, EngineError> {
        let doc = self.collection(collection)?.delete(id)?;
        Counters::bump(&self.counters.deleted, 1);
        Ok(doc)
    }

    pub fn delete_one(&self, collection: &str, query: &Query) -> Result<usize, EngineError> {
        let removed = self.collection(collection)?.delete_one(query);
        Counters::bump(&self.counters.deleted, removed);
        Ok(removed)
    }

    pub fn delete_many(&self, collection: &str, query: &Query) -> Result<usize, EngineError> {
        let removed = self.collection(collection)?.delete_many(query);
        Counters::bump(&self.counters.deleted, removed);
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, EngineError> {
        Ok(self.collection(collection)?.get(id))
    }

    pub fn find(&self, collection: &str, query: &Query) -> Result<QueryResult, EngineError> {
        let result = self.collection(collection)?.find(query);
        Counters::bump(&self.counters.queries, 1);
        Ok(result)
    }

    pub fn find_one(&self, collection: &str, query: &Query) -> Result<Option<Document>, EngineError> {
        let doc = self.collection(collection)?.find_one(query);
        Counters::bump(&self.counters.queries, 1);
        Ok(doc)
    }

    pub fn count(&self, collection: &str, query: &Query) -> Result<usize, EngineError> {
        Ok(self.collection(collection)?.count_matching(query))
    }

    pub fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>, EngineError> {
        let rows = self.collection(collection)?.aggregate(pipeline)?;
        Counters::bump(&self.counters.queries, 1);
        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Indexes
    // -------------------------------------------------------------------------

    /// Build an index. `false` means an identical index already existed.
    pub fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<bool, EngineError> {
        let name = spec.name.clone();
        let created = self.collection(collection)?.create_index(spec)?;
        if created {
            debug!(collection = %collection, index = %name, "Created index");
        }
        Ok(created)
    }

    pub fn drop_index(&self, collection: &str, name: &str) -> Result<bool, EngineError> {
        Ok(self.collection(collection)?.drop_index(name))
    }

    pub fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>, EngineError> {
        Ok(self.collection(collection)?.index_specs())
    }

    // -------------------------------------------------------------------------
    // Statistics
    // -------------------------------------------------------------------------

    pub fn stats(&self) -> EngineStats {
        self.counters.snapshot()
    }

    pub fn reset_stats(&self) {
        self.counters.clear();
    }
}

impl Default for DocumentEngine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Engine Error
// =============================================================================

#[derive(Debug, Clone)]
pub enum EngineError {
    CollectionExists(String),
    CollectionNotFound(String),
    InvalidName(String),
    TooManyCollections,
    Collection(CollectionError),
    DocumentTooLarge { size: usize, max: usize },
}

impl From<CollectionError> for EngineError {
    fn from(err: CollectionError) -> Self {
        Self::Collection(err)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollectionExists(name) => write!(f, "Collection already exists: {}", name),
            Self::CollectionNotFound(name) => write!(f, "Collection not found: {}", name),
            Self::InvalidName(name) => write!(f, "Invalid collection name: '{}'", name),
            Self::TooManyCollections => f.write_str("Maximum number of collections reached"),
            Self::Collection(err) => fmt::Display::fmt(err, f),
            Self::DocumentTooLarge { size, max } => {
                write!(f, "Document of {} bytes exceeds maximum size {}", size, max)
            }
        }
    }
}

impl std::error::Error for EngineError {}

// =============================================================================
// Tests
// =============================================================================
