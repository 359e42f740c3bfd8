//! Folio Document Store Trait
//!
//! The seam between the data-access layer and whatever serves the
//! documents. Repositories hold an `Arc<dyn DocumentStore>`.
//!
//! @version 0.1.0
//! @author Folio Development Team

use async_trait::async_trait;
use folio_common::Result;
use folio_document::{
    Document, DocumentId, IndexSpec, Pipeline, Query, Schema, Update, UpdateResult, Value,
};

/// One database of a document store.
///
/// Each call is atomic with respect to a single collection. Failures are
/// reported as `FolioError`: `NotFound` for a missing collection,
/// `Validation` for rejected writes, `Connection` when the store cannot be
/// reached.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Create the collection if missing; a given schema replaces the
    /// current one.
    async fn ensure_collection(&self, collection: &str, schema: Option<Schema>) -> Result<()>;

    async fn drop_collection(&self, collection: &str) -> Result<()>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Returns `false` when the same index already existed.
    async fn create_index(&self, collection: &str, spec: IndexSpec) -> Result<bool>;

    async fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>>;

    async fn insert(&self, collection: &str, doc: Document) -> Result<DocumentId>;

    /// Stores every document or none.
    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<DocumentId>>;

    async fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>>;

    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    async fn count(&self, collection: &str, query: &Query) -> Result<usize>;

    async fn update_one(&self, collection: &str, query: &Query, update: &Update) -> Result<UpdateResult>;

    async fn update_many(&self, collection: &str, query: &Query, update: &Update) -> Result<UpdateResult>;

    async fn delete_one(&self, collection: &str, query: &Query) -> Result<usize>;

    async fn delete_many(&self, collection: &str, query: &Query) -> Result<usize>;

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>>;
}
